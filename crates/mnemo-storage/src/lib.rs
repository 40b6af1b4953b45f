//! Durable thread state: one JSON file per thread, or a single SQLite database,
//! plus checksummed backups that work across both

mod backup;
mod json;
mod sqlite;

pub use backup::{checksum, BackupArchive, BackupManager, BackupMetadata, RestoreSummary};
pub use json::JsonFileStore;
pub use sqlite::SqliteStore;
