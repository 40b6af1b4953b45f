//! Path resolution for mnemo state files

use std::path::{Path, PathBuf};

/// Resolves the on-disk layout under the mnemo home directory (`~/.mnemo`)
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
}

impl Paths {
    /// Resolve `~/.mnemo` for the current user
    pub fn new() -> std::io::Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "home directory not found")
        })?;
        Ok(Self {
            home: home.join(".mnemo"),
        })
    }

    /// Use an explicit root instead of the home directory
    pub fn at(root: &Path) -> Self {
        Self {
            home: root.to_path_buf(),
        }
    }

    /// Optional JSON configuration file
    pub fn config_file(&self) -> PathBuf {
        self.home.join("mnemo.json")
    }

    /// Directory holding one JSON snapshot per thread
    pub fn threads_dir(&self) -> PathBuf {
        self.home.join("threads")
    }

    /// SQLite database used by the sqlite state store
    pub fn sqlite_file(&self) -> PathBuf {
        self.home.join("observations.db")
    }

    /// Backup archives and their `.meta.json` files
    pub fn backups_dir(&self) -> PathBuf {
        self.home.join("backups")
    }

    pub fn telemetry_dir(&self) -> PathBuf {
        self.home.join("telemetry")
    }

    /// interactions.jsonl path
    pub fn interactions_file(&self) -> PathBuf {
        self.telemetry_dir().join("interactions.jsonl")
    }
}
