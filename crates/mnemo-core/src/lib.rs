//! Observation buffer and reflection engine for rolling conversational memory

mod config;
mod error;
mod memory;
mod persist;
mod policy;
mod render;
mod semantic;
mod store;
mod tokens;
mod types;

pub use config::{EstimatorKind, MemoryConfig};
pub use error::{MemoryError, Result};
pub use memory::{SemanticStatus, ThreadStats, UnifiedMemory, UnifiedStats};
pub use persist::{InMemoryStateStore, StateStore};
pub use policy::{CompactionPolicy, IngestReport, MergeSummary, ReflectionOutcome};
pub use render::{render_context, title_case, ContextSections, MEMORY_SECTION, NO_MEMORY};
pub use semantic::{NoopSemantic, SemanticMemory, SemanticQuery};
pub use store::ObservationStore;
pub use tokens::{Estimator, TokenEstimator, WordHeuristic};
#[cfg(feature = "tiktoken")]
pub use tokens::TiktokenEstimator;
pub use types::{Message, Observation, ThreadSnapshot};
