//! Persistence port for thread state

use crate::types::ThreadSnapshot;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Loads and saves whole thread snapshots. Saving overwrites.
pub trait StateStore: Send + Sync {
    fn load(&self, thread_id: &str) -> anyhow::Result<Option<ThreadSnapshot>>;

    fn save(&self, snapshot: &ThreadSnapshot) -> anyhow::Result<()>;

    fn thread_ids(&self) -> anyhow::Result<Vec<String>>;
}

/// Process-local store, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    threads: Mutex<BTreeMap<String, ThreadSnapshot>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&self, thread_id: &str) -> anyhow::Result<Option<ThreadSnapshot>> {
        let threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(threads.get(thread_id).cloned())
    }

    fn save(&self, snapshot: &ThreadSnapshot) -> anyhow::Result<()> {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        threads.insert(snapshot.thread_id.clone(), snapshot.clone());
        Ok(())
    }

    fn thread_ids(&self) -> anyhow::Result<Vec<String>> {
        let threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(threads.keys().cloned().collect())
    }
}
