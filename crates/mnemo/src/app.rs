use crate::cli::{Cli, StoreKind};
use mnemo_core::{MemoryConfig, StateStore, UnifiedMemory};
use mnemo_semantic::{HttpSemanticMemory, DEFAULT_TIMEOUT};
use mnemo_storage::{JsonFileStore, SqliteStore};
use mnemo_telemetry::{read_json_or_default, Paths};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// `~/.mnemo/mnemo.json`. Engine settings sit at the top level next to the
/// semantic service options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(flatten)]
    pub memory: MemoryConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_timeout_ms: Option<u64>,
}

/// Defaults when the file is absent or unreadable
pub fn load_config(paths: &Paths) -> ConfigFile {
    let config_path = paths.config_file();
    match read_json_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "invalid config, using defaults");
            ConfigFile::default()
        }
    }
}

/// Everything a command needs to build the memory engine
pub struct App {
    pub paths: Paths,
    pub store: StoreKind,
    pub semantic_url: Option<String>,
}

impl App {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        Ok(Self {
            paths: Paths::new()?,
            store: cli.store,
            semantic_url: cli.semantic_url.clone(),
        })
    }

    pub fn at(paths: Paths, store: StoreKind) -> Self {
        Self {
            paths,
            store,
            semantic_url: None,
        }
    }

    pub fn config(&self) -> ConfigFile {
        load_config(&self.paths)
    }

    /// The persistence adapter selected by `--store`
    pub fn state_store(&self) -> anyhow::Result<Box<dyn StateStore>> {
        Ok(match self.store {
            StoreKind::Json => Box::new(JsonFileStore::from_paths(&self.paths)),
            StoreKind::Sqlite => Box::new(SqliteStore::from_paths(&self.paths)?),
        })
    }

    pub fn memory(&self) -> anyhow::Result<UnifiedMemory> {
        let config = self.config();
        let mut memory = UnifiedMemory::new(config.memory).with_persistence(self.state_store()?);

        if let Some(url) = self.semantic_url.clone().or(config.semantic_url) {
            let timeout = config
                .semantic_timeout_ms
                .map_or(DEFAULT_TIMEOUT, Duration::from_millis);
            memory = memory.with_semantic(Box::new(HttpSemanticMemory::with_timeout(url, timeout)?));
        }
        Ok(memory)
    }
}
