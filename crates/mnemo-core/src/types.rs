//! Core types: messages, observations and persisted thread snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// A condensed record distilled from one or more raw messages.
///
/// Fields are read-only: the only way to change what a thread remembers is to
/// replace observations through reflection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    thread_id: String,
    content: String,
    created_at: DateTime<Utc>,
    source_message_count: usize,
    #[serde(default)]
    reflection_generation: u32,
}

impl Observation {
    /// Fresh observation (generation 0) stamped with the current time
    pub fn new(
        thread_id: impl Into<String>,
        content: impl Into<String>,
        source_message_count: usize,
    ) -> Self {
        Self::restore(
            thread_id,
            content,
            Utc::now(),
            source_message_count,
            0,
        )
    }

    /// Rebuild an observation from persisted fields
    pub fn restore(
        thread_id: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
        source_message_count: usize,
        reflection_generation: u32,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            content: content.into(),
            created_at,
            source_message_count: source_message_count.max(1),
            reflection_generation,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn source_message_count(&self) -> usize {
        self.source_message_count
    }

    pub fn reflection_generation(&self) -> u32 {
        self.reflection_generation
    }
}

/// Everything needed to reload a thread: its ordered observations plus counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub thread_id: String,
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub messages_processed: usize,
    #[serde(default)]
    pub reflection_count: usize,
}

impl ThreadSnapshot {
    pub fn empty(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            observations: Vec::new(),
            messages_processed: 0,
            reflection_count: 0,
        }
    }
}
