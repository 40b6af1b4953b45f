use thiserror::Error;

/// Errors raised by the compaction engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// `replace_range` called with indices outside the store (programmer error)
    #[error("invalid replace range [{start}, {end}) on a store of {len} observations")]
    Range {
        start: usize,
        end: usize,
        len: usize,
    },

    /// The precise tokenizer could not be loaded. Handled by falling back to
    /// the heuristic; never returned from the façade.
    #[error("precise tokenizer unavailable: {0}")]
    EstimationUnavailable(String),
}

pub type Result<T> = std::result::Result<T, MemoryError>;
