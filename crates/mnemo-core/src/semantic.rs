//! Port to an optional external semantic memory service

use serde::{Deserialize, Serialize};

/// Answer to a semantic lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticQuery {
    #[serde(default)]
    pub confidence_tier: String,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub token_count: usize,
}

impl SemanticQuery {
    /// Section text for the context renderer, `None` when nothing came back
    pub fn render(&self) -> Option<String> {
        let items: Vec<&str> = self
            .items
            .iter()
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .collect();
        if items.is_empty() {
            return None;
        }

        let mut lines = Vec::with_capacity(items.len() + 1);
        if !self.confidence_tier.is_empty() {
            lines.push(format!("Confidence: {}", self.confidence_tier));
        }
        lines.extend(items.iter().map(|i| format!("- {}", i)));
        Some(lines.join("\n"))
    }
}

/// Black-box store/query service.
///
/// The façade calls these synchronously and applies no deadline of its own, so
/// every implementation must bound its own latency and return an error when it
/// runs out (`HttpSemanticMemory` defaults to 2 s). Any error is treated as
/// missing context.
pub trait SemanticMemory: Send + Sync {
    fn name(&self) -> &str;

    /// Remember `text`; `Ok(false)` when the service declined it
    fn store(&self, text: &str) -> anyhow::Result<bool>;

    fn query(&self, text: &str) -> anyhow::Result<SemanticQuery>;
}

/// Stand-in used when no service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSemantic;

impl SemanticMemory for NoopSemantic {
    fn name(&self) -> &str {
        "noop"
    }

    fn store(&self, _text: &str) -> anyhow::Result<bool> {
        Ok(false)
    }

    fn query(&self, _text: &str) -> anyhow::Result<SemanticQuery> {
        Ok(SemanticQuery::default())
    }
}
