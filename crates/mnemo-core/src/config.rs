//! Configuration for the compaction engine

use serde::{Deserialize, Serialize};

/// Which token estimation strategy to construct
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorKind {
    /// `word_count * words_to_tokens`
    #[default]
    Heuristic,
    /// BPE tokenizer (requires the `tiktoken` feature, falls back to heuristic)
    Precise,
}

/// Memory engine configuration, supplied once at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Token ceiling per thread; exceeding it triggers reflection
    pub max_tokens: usize,

    /// Token estimation strategy
    pub estimator: EstimatorKind,

    /// Heuristic multiplier (tokens per whitespace-separated word)
    pub words_to_tokens: usize,

    /// Structural cost added per message when estimating a batch
    pub message_overhead: usize,

    /// Metadata cost added per observation when estimating a store
    pub observation_overhead: usize,

    /// Upper bound on a freshly distilled observation, in chars
    pub max_observation_chars: usize,

    /// Joins the contents of observations merged by reflection
    pub merge_separator: String,

    /// Push each new observation to the semantic service when one is attached
    pub store_observations_semantically: bool,
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self {
            max_tokens: 2000,
            estimator: EstimatorKind::Heuristic,
            words_to_tokens: 4,
            message_overhead: 5,
            observation_overhead: 10,
            max_observation_chars: 2000,
            merge_separator: "\n".to_string(),
            store_observations_semantically: false,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::new()
    }
}
