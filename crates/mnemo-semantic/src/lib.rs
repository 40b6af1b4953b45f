//! HTTP client for an external semantic memory service

mod client;

pub use client::{HttpSemanticMemory, DEFAULT_TIMEOUT};
