use anyhow::{Context, Result};
use mnemo_core::{StateStore, ThreadSnapshot};
use mnemo_telemetry::{atomic_write, Paths};
use std::path::PathBuf;
use tracing::debug;

/// One `<thread>.json` document per thread, replaced atomically on save
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_paths(paths: &Paths) -> Self {
        Self::new(paths.threads_dir())
    }

    fn file_for(&self, thread_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_thread_id(thread_id)))
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, thread_id: &str) -> Result<Option<ThreadSnapshot>> {
        let path = self.file_for(thread_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &ThreadSnapshot) -> Result<()> {
        let path = self.file_for(&snapshot.thread_id);
        let data = serde_json::to_vec_pretty(snapshot)?;
        atomic_write(&path, &data).with_context(|| format!("writing {}", path.display()))?;
        debug!(
            thread_id = %snapshot.thread_id,
            observations = snapshot.observations.len(),
            "thread saved"
        );
        Ok(())
    }

    fn thread_ids(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_thread_id)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Filename-safe form: ASCII alphanumerics, `-` and `_` kept, every other
/// byte written as `%XX`
fn encode_thread_id(thread_id: &str) -> String {
    let mut encoded = String::with_capacity(thread_id.len());
    for byte in thread_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

fn decode_thread_id(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = std::str::from_utf8(bytes.get(i + 1..i + 3)?).ok()?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}
