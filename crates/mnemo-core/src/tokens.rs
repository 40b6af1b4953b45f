//! Token estimation

use crate::config::{EstimatorKind, MemoryConfig};
use crate::error::MemoryError;
use crate::types::{Message, Observation};
use tracing::{debug, warn};

/// Pluggable text-to-token strategy
pub trait TokenEstimator: Send + Sync {
    /// Short strategy name reported in stats
    fn name(&self) -> &'static str;

    /// Estimated tokens in `text`
    fn estimate(&self, text: &str) -> usize;
}

/// `word_count * factor`; always available
#[derive(Debug, Clone, Copy)]
pub struct WordHeuristic {
    factor: usize,
}

impl WordHeuristic {
    pub fn new(factor: usize) -> Self {
        Self { factor }
    }
}

impl Default for WordHeuristic {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenEstimator for WordHeuristic {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn estimate(&self, text: &str) -> usize {
        text.split_whitespace().count() * self.factor
    }
}

/// cl100k_base BPE counts
#[cfg(feature = "tiktoken")]
pub struct TiktokenEstimator {
    bpe: tiktoken_rs::CoreBPE,
}

#[cfg(feature = "tiktoken")]
impl TiktokenEstimator {
    pub fn cl100k() -> Result<Self, MemoryError> {
        tiktoken_rs::cl100k_base()
            .map(|bpe| Self { bpe })
            .map_err(|e| MemoryError::EstimationUnavailable(e.to_string()))
    }
}

#[cfg(feature = "tiktoken")]
impl TokenEstimator for TiktokenEstimator {
    fn name(&self) -> &'static str {
        "tiktoken"
    }

    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

#[cfg(feature = "tiktoken")]
fn precise_strategy() -> Result<Box<dyn TokenEstimator>, MemoryError> {
    let estimator = TiktokenEstimator::cl100k()?;
    Ok(Box::new(estimator))
}

#[cfg(not(feature = "tiktoken"))]
fn precise_strategy() -> Result<Box<dyn TokenEstimator>, MemoryError> {
    Err(MemoryError::EstimationUnavailable(
        "built without the `tiktoken` feature".to_string(),
    ))
}

/// Token estimator with per-item overheads for messages and observations.
///
/// Callers only see this type; which strategy backs it is decided once in
/// [`Estimator::from_config`].
pub struct Estimator {
    strategy: Box<dyn TokenEstimator>,
    message_overhead: usize,
    observation_overhead: usize,
}

impl Estimator {
    /// Build the configured strategy, falling back to the heuristic when the
    /// precise tokenizer cannot be loaded
    pub fn from_config(config: &MemoryConfig) -> Self {
        let heuristic =
            || Box::new(WordHeuristic::new(config.words_to_tokens)) as Box<dyn TokenEstimator>;

        let strategy = match config.estimator {
            EstimatorKind::Heuristic => heuristic(),
            EstimatorKind::Precise => match precise_strategy() {
                Ok(precise) => precise,
                Err(e) => {
                    warn!(error = %e, "falling back to word heuristic token estimation");
                    heuristic()
                }
            },
        };
        debug!(strategy = strategy.name(), "token estimator ready");

        Self::with_strategy(
            strategy,
            config.message_overhead,
            config.observation_overhead,
        )
    }

    pub fn with_strategy(
        strategy: Box<dyn TokenEstimator>,
        message_overhead: usize,
        observation_overhead: usize,
    ) -> Self {
        Self {
            strategy,
            message_overhead,
            observation_overhead,
        }
    }

    pub fn strategy(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn observation_overhead(&self) -> usize {
        self.observation_overhead
    }

    pub fn estimate(&self, text: &str) -> usize {
        self.strategy.estimate(text)
    }

    /// Content plus observation overhead
    pub fn estimate_observation(&self, observation: &Observation) -> usize {
        self.estimate(observation.content()) + self.observation_overhead
    }

    pub fn estimate_observations(&self, observations: &[Observation]) -> usize {
        observations
            .iter()
            .map(|o| self.estimate_observation(o))
            .sum()
    }

    pub fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages
            .iter()
            .map(|m| self.estimate(&m.content) + self.message_overhead)
            .sum()
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::from_config(&MemoryConfig::default())
    }
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("strategy", &self.strategy.name())
            .field("message_overhead", &self.message_overhead)
            .field("observation_overhead", &self.observation_overhead)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CharCount;

    impl TokenEstimator for CharCount {
        fn name(&self) -> &'static str {
            "chars"
        }

        fn estimate(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    #[test]
    fn test_heuristic_counts_words() {
        let heuristic = WordHeuristic::default();
        assert_eq!(heuristic.estimate(""), 0);
        assert_eq!(heuristic.estimate("   \n\t "), 0);
        assert_eq!(heuristic.estimate("hello there world"), 12);
    }

    #[test]
    fn test_collection_overheads() {
        let estimator = Estimator::default();
        let messages = vec![Message::user("one two"), Message::assistant("")];
        // (2 * 4 + 5) + (0 + 5)
        assert_eq!(estimator.estimate_messages(&messages), 18);

        let observations = vec![
            Observation::new("t1", "[user] one two", 1),
            Observation::new("t1", "[user] three", 1),
        ];
        // (3 * 4 + 10) + (2 * 4 + 10)
        assert_eq!(estimator.estimate_observations(&observations), 40);
        assert_eq!(estimator.estimate_observations(&[]), 0);
        assert_eq!(estimator.estimate_messages(&[]), 0);
    }

    #[test]
    fn test_custom_strategy_is_used() {
        let estimator = Estimator::with_strategy(Box::new(CharCount), 0, 1);
        assert_eq!(estimator.strategy(), "chars");
        assert_eq!(estimator.estimate("abcd"), 4);
        assert_eq!(
            estimator.estimate_observation(&Observation::new("t", "abc", 1)),
            4
        );
    }

    #[cfg(not(feature = "tiktoken"))]
    #[test]
    fn test_precise_falls_back_without_feature() {
        let config = MemoryConfig {
            estimator: EstimatorKind::Precise,
            ..MemoryConfig::default()
        };
        let estimator = Estimator::from_config(&config);
        assert_eq!(estimator.strategy(), "heuristic");
        assert_eq!(estimator.estimate("two words"), 8);
    }

    #[cfg(feature = "tiktoken")]
    #[test]
    fn test_precise_strategy_loads() {
        let config = MemoryConfig {
            estimator: EstimatorKind::Precise,
            ..MemoryConfig::default()
        };
        let estimator = Estimator::from_config(&config);
        assert_eq!(estimator.strategy(), "tiktoken");
        assert!(estimator.estimate("hello world") > 0);
    }
}
