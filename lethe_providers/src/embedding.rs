use async_trait::async_trait;
use lethe_core::EmbeddingProvider;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::retry::{RetryPolicy, retry_with_backoff};

/// Embeddings from an Ollama server's `/api/embed` endpoint.
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl OllamaEmbedder {
    /// Convert f64 to f32 for embedding values
    /// Precision loss is acceptable for ML embeddings
    #[expect(clippy::cast_possible_truncation, reason = "ML embeddings use f32")]
    const fn f64_to_f32(x: f64) -> f32 {
        x as f32
    }

    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        info!("Creating OllamaEmbedder: {} ({})", base_url, model);
        Self {
            client: Client::new(),
            base_url,
            model,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn try_embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&json!({
                "model": self.model,
                "input": texts,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        parse_embeddings(&response, texts.len())
    }
}

fn parse_embeddings(response: &serde_json::Value, expected: usize) -> anyhow::Result<Vec<Vec<f32>>> {
    let rows = response["embeddings"]
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid response format: missing embeddings"))?;

    if rows.len() != expected {
        anyhow::bail!(
            "Embedding count mismatch: sent {expected} texts, received {}",
            rows.len()
        );
    }

    rows.iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| anyhow::anyhow!("Invalid embedding row"))?
                .iter()
                .map(|v| {
                    v.as_f64()
                        .map(OllamaEmbedder::f64_to_f32)
                        .ok_or_else(|| anyhow::anyhow!("Invalid embedding value"))
                })
                .collect::<Result<Vec<f32>, _>>()
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut rows = self.embed_batch(&[text.to_string()]).await?;
        rows.pop()
            .ok_or_else(|| anyhow::anyhow!("Embedding endpoint returned no vectors"))
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts with {}", texts.len(), self.model);
        retry_with_backoff(|| self.try_embed(texts), &self.retry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_embedding_rows() {
        let response = json!({"model": "m", "embeddings": [[0.5, 1.0], [0.0, -1.0]]});
        let rows = parse_embeddings(&response, 2).unwrap();
        assert_eq!(rows, vec![vec![0.5_f32, 1.0], vec![0.0, -1.0]]);
    }

    #[test]
    fn rejects_count_mismatch() {
        let response = json!({"embeddings": [[0.5, 1.0]]});
        assert!(parse_embeddings(&response, 2).is_err());
    }

    #[test]
    fn rejects_missing_field() {
        let response = json!({"error": "model not found"});
        assert!(parse_embeddings(&response, 1).is_err());
    }

    #[tokio::test]
    async fn empty_batch_skips_request() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:9", "m").with_retry(RetryPolicy::none());
        let rows = embedder.embed_batch(&[]).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:9", "m").with_retry(RetryPolicy::none());
        assert!(embedder.embed("hello").await.is_err());
    }
}
