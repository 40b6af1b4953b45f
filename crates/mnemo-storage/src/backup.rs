//! Point-in-time backups of every thread plus the config file

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use mnemo_core::{StateStore, ThreadSnapshot};
use mnemo_telemetry::{atomic_write, Paths};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{info, warn};

const ARCHIVE_EXT: &str = "json";
const METADATA_SUFFIX: &str = ".meta.json";

/// Everything one backup holds. Snapshots go through the `StateStore` port, so
/// an archive taken from one store kind restores into the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupArchive {
    pub created_at: DateTime<Utc>,
    pub threads: Vec<ThreadSnapshot>,
    /// Raw text of `mnemo.json`, kept byte for byte
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

/// `<name>.meta.json`, written next to the archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub thread_count: usize,
    pub observation_count: usize,
    pub size_bytes: u64,
    /// Hex SHA-256 of the archive file
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreSummary {
    pub name: String,
    pub threads: usize,
    pub config_restored: bool,
    pub verified: bool,
}

pub struct BackupManager {
    paths: Paths,
}

impl BackupManager {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    fn archive_path(&self, name: &str) -> PathBuf {
        self.paths
            .backups_dir()
            .join(format!("{}.{}", name, ARCHIVE_EXT))
    }

    fn metadata_path(&self, name: &str) -> PathBuf {
        self.paths
            .backups_dir()
            .join(format!("{}{}", name, METADATA_SUFFIX))
    }

    pub fn create(&self, store: &dyn StateStore, name: Option<&str>) -> Result<BackupMetadata> {
        let name = match name {
            Some(name) => validate_name(name)?.to_string(),
            None => default_name(),
        };
        let archive_path = self.archive_path(&name);
        if archive_path.exists() {
            bail!("backup '{}' already exists", name);
        }

        let mut threads = Vec::new();
        for thread_id in store.thread_ids()? {
            if let Some(snapshot) = store.load(&thread_id)? {
                threads.push(snapshot);
            }
        }

        let config_path = self.paths.config_file();
        let config = if config_path.exists() {
            Some(
                std::fs::read_to_string(&config_path)
                    .with_context(|| format!("reading {}", config_path.display()))?,
            )
        } else {
            None
        };

        let archive = BackupArchive {
            created_at: Utc::now(),
            threads,
            config,
        };
        let data = serde_json::to_vec_pretty(&archive)?;
        atomic_write(&archive_path, &data)
            .with_context(|| format!("writing {}", archive_path.display()))?;

        let metadata = BackupMetadata {
            name,
            created_at: archive.created_at,
            thread_count: archive.threads.len(),
            observation_count: archive.threads.iter().map(|t| t.observations.len()).sum(),
            size_bytes: data.len() as u64,
            checksum: checksum(&data),
        };
        let metadata_path = self.metadata_path(&metadata.name);
        atomic_write(&metadata_path, &serde_json::to_vec_pretty(&metadata)?)
            .with_context(|| format!("writing {}", metadata_path.display()))?;

        info!(
            name = %metadata.name,
            threads = metadata.thread_count,
            size_bytes = metadata.size_bytes,
            "backup created"
        );
        Ok(metadata)
    }

    /// Newest first
    pub fn list(&self) -> Result<Vec<BackupMetadata>> {
        let dir = self.paths.backups_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_metadata = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(METADATA_SUFFIX));
            if !is_metadata {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|text| serde_json::from_str::<BackupMetadata>(&text).map_err(Into::into));
            match parsed {
                Ok(metadata) => backups.push(metadata),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable backup metadata"),
            }
        }

        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(backups)
    }

    /// Threads missing from the archive are left untouched in `store`
    pub fn restore(&self, store: &dyn StateStore, name: &str, verify: bool) -> Result<RestoreSummary> {
        let name = validate_name(name)?;
        let archive_path = self.archive_path(name);
        if !archive_path.exists() {
            bail!("backup not found: {}", name);
        }
        let data = std::fs::read(&archive_path)
            .with_context(|| format!("reading {}", archive_path.display()))?;

        if verify {
            let metadata_path = self.metadata_path(name);
            let metadata: BackupMetadata = serde_json::from_str(
                &std::fs::read_to_string(&metadata_path)
                    .with_context(|| format!("reading {}", metadata_path.display()))?,
            )
            .with_context(|| format!("parsing {}", metadata_path.display()))?;
            let actual = checksum(&data);
            if actual != metadata.checksum {
                bail!(
                    "checksum mismatch for backup '{}': expected {}, got {}",
                    name,
                    metadata.checksum,
                    actual
                );
            }
        }

        let archive: BackupArchive = serde_json::from_slice(&data)
            .with_context(|| format!("parsing {}", archive_path.display()))?;
        for snapshot in &archive.threads {
            store.save(snapshot)?;
        }

        let config_restored = match &archive.config {
            Some(config) => {
                let config_path = self.paths.config_file();
                atomic_write(&config_path, config.as_bytes())
                    .with_context(|| format!("writing {}", config_path.display()))?;
                true
            }
            None => false,
        };

        info!(name, threads = archive.threads.len(), verify, "backup restored");
        Ok(RestoreSummary {
            name: name.to_string(),
            threads: archive.threads.len(),
            config_restored,
            verified: verify,
        })
    }

    /// Keep the newest `keep` backups; returns how many were removed
    pub fn prune(&self, keep: usize) -> Result<usize> {
        let mut removed = 0;
        for old in self.list()?.into_iter().skip(keep) {
            for path in [self.archive_path(&old.name), self.metadata_path(&old.name)] {
                if path.exists() {
                    std::fs::remove_file(&path)
                        .with_context(|| format!("removing {}", path.display()))?;
                }
            }
            info!(name = %old.name, "backup pruned");
            removed += 1;
        }
        Ok(removed)
    }
}

pub fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn default_name() -> String {
    format!("backup-{}", Utc::now().format("%Y%m%d-%H%M%S-%3f"))
}

fn validate_name(name: &str) -> Result<&str> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if name.is_empty() || name.starts_with('.') || !name.chars().all(allowed) {
        bail!("invalid backup name '{}'", name);
    }
    Ok(name)
}
