//! Telemetry records, path resolution and file I/O helpers shared by the mnemo crates

mod io;
mod paths;
mod types;

pub use io::{append_jsonl, atomic_write, read_json_or_default, read_jsonl};
pub use paths::Paths;
pub use types::InteractionRecord;
