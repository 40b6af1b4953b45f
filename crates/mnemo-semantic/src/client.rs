use anyhow::{Context, Result};
use mnemo_core::{SemanticMemory, SemanticQuery};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct StoreResponse {
    #[serde(default)]
    stored: bool,
}

/// Talks to a service exposing `POST /store` and `POST /query`, both taking
/// `{"text": ...}`. Every call is bounded by the configured timeout.
pub struct HttpSemanticMemory {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpSemanticMemory {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("building semantic client runtime")?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            timeout,
            client,
            runtime,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, text: &str) -> Result<T> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    fn call<T: DeserializeOwned>(&self, path: &str, text: &str) -> Result<T> {
        let request = tokio::time::timeout(self.timeout, self.post(path, text));
        self.runtime
            .block_on(request)
            .with_context(|| format!("{} timed out after {:?}", self.endpoint(path), self.timeout))?
    }
}

impl SemanticMemory for HttpSemanticMemory {
    fn name(&self) -> &str {
        "http"
    }

    fn store(&self, text: &str) -> Result<bool> {
        let response: StoreResponse = self.call("store", text)?;
        debug!(stored = response.stored, "semantic store answered");
        Ok(response.stored)
    }

    fn query(&self, text: &str) -> Result<SemanticQuery> {
        let answer: SemanticQuery = self.call("query", text)?;
        debug!(
            items = answer.items.len(),
            tier = %answer.confidence_tier,
            "semantic query answered"
        );
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_endpoint_joins_paths() {
        let client = HttpSemanticMemory::new("http://localhost:8900/").unwrap();
        assert_eq!(client.endpoint("query"), "http://localhost:8900/query");

        let client = HttpSemanticMemory::new("http://localhost:8900/api").unwrap();
        assert_eq!(client.endpoint("store"), "http://localhost:8900/api/store");
    }

    #[test]
    fn test_query_response_tolerates_missing_fields() {
        let answer: SemanticQuery =
            serde_json::from_str(r#"{"items": ["likes rust"]}"#).unwrap();
        assert_eq!(answer.items, vec!["likes rust".to_string()]);
        assert!(answer.confidence_tier.is_empty());

        let stored: StoreResponse = serde_json::from_str("{}").unwrap();
        assert!(!stored.stored);
    }

    #[test]
    fn test_unreachable_service_fails_fast() {
        let client =
            HttpSemanticMemory::with_timeout("http://127.0.0.1:1", Duration::from_millis(300))
                .unwrap();

        let started = Instant::now();
        assert!(client.query("anything").is_err());
        assert!(client.store("anything").is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_stalled_service_is_cut_off_by_timeout() {
        // Accepts connections but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let client = HttpSemanticMemory::with_timeout(url, Duration::from_millis(200)).unwrap();

        let started = Instant::now();
        assert!(client.query("anything").is_err());
        assert!(client.store("anything").is_err());
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
        drop(listener);
    }
}
