use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::application::EmbeddingService;
use crate::domain::DomainError;

/// Default target: llama-server running an embedding model locally.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";
const EMBEDDING_PATH: &str = "/embedding";
/// nomic-embed-text-v1.5 output width.
pub const DEFAULT_DIMENSIONS: usize = 768;

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    embedding: Vec<f32>,
}

/// HTTP client for a llama-server `/embedding` endpoint.
///
/// The serving and ingestion paths both rely on every embedding having the
/// configured dimension, so this client never surfaces transport or decode
/// failures: it logs a warning and returns the all-zero vector instead.
/// Configure via environment variables:
///
/// ```text
/// EMBEDDING_BASE_URL=http://localhost:8081
/// EMBEDDING_DIMENSIONS=768
/// ```
pub struct LlamaEmbeddingClient {
    client: reqwest::Client,
    url: String,
    dimensions: usize,
}

impl LlamaEmbeddingClient {
    pub fn new(base_url: impl Into<String>, dimensions: usize) -> Self {
        let base: String = base_url.into();
        let url = format!("{}{EMBEDDING_PATH}", base.trim_end_matches('/'));
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            url,
            dimensions,
        }
    }

    pub fn from_env() -> Self {
        let base = std::env::var("EMBEDDING_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let dimensions = std::env::var("EMBEDDING_DIMENSIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_DIMENSIONS);
        Self::new(base, dimensions)
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ApiRequest { content: text })
            .send()
            .await
            .map_err(|e| DomainError::embedding(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DomainError::embedding(format!(
                "server returned {}",
                response.status()
            )));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| DomainError::embedding(format!("bad response body: {e}")))?;

        if body.embedding.len() != self.dimensions {
            return Err(DomainError::embedding(format!(
                "expected {} dimensions, got {}",
                self.dimensions,
                body.embedding.len()
            )));
        }

        Ok(body.embedding)
    }
}

#[async_trait]
impl EmbeddingService for LlamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        match self.request(text).await {
            Ok(vector) => Ok(vector),
            Err(e) => {
                warn!("Embedding degraded to zero vector: {e}");
                Ok(vec![0.0; self.dimensions])
            }
        }
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
