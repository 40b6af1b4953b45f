//! Telemetry record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One `process_interaction` call as seen by the compaction engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub thread_id: String,
    pub timestamp: DateTime<Utc>,
    pub messages: usize,
    /// Tokens in the store right after the new observation was appended
    pub tokens_before_reflection: usize,
    pub tokens_after: usize,
    pub max_tokens: usize,
    #[serde(default)]
    pub merges: usize,
    #[serde(default)]
    pub observations_merged: usize,
    #[serde(default)]
    pub over_budget: bool,
    #[serde(default)]
    pub observation_count: usize,
    #[serde(default)]
    pub context_chars: usize,
}

impl InteractionRecord {
    /// Fraction of the appended total removed by reflection (0.0 when nothing ran)
    pub fn reduction_ratio(&self) -> f64 {
        if self.tokens_before_reflection == 0 {
            return 0.0;
        }
        let saved = self
            .tokens_before_reflection
            .saturating_sub(self.tokens_after);
        saved as f64 / self.tokens_before_reflection as f64
    }
}
