use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::GenerationService;
use crate::domain::DomainError;

/// Default target: llama-server running the chat model locally.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8082";
const COMPLETION_PATH: &str = "/completion";
const MAX_PREDICT_TOKENS: u32 = 1024;

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: String,
}

/// HTTP client for a llama-server `/completion` endpoint.
///
/// Unlike the embedding client there is no degraded mode: a failed
/// generation is a [`DomainError::Generation`] the handler turns into a
/// structured 500 response. Configure via:
///
/// ```text
/// GENERATION_BASE_URL=http://localhost:8082
/// ```
pub struct LlamaGenerationClient {
    client: reqwest::Client,
    url: String,
}

impl LlamaGenerationClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base: String = base_url.into();
        let url = format!("{}{COMPLETION_PATH}", base.trim_end_matches('/'));
        Self {
            client: reqwest::Client::builder()
                // Generation is the slowest collaborator by far.
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            url,
        }
    }

    pub fn from_env() -> Self {
        let base = std::env::var("GENERATION_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base)
    }
}

#[async_trait]
impl GenerationService for LlamaGenerationClient {
    async fn generate(&self, prompt: &str) -> Result<String, DomainError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ApiRequest {
                prompt,
                n_predict: MAX_PREDICT_TOKENS,
                temperature: 0.8,
            })
            .send()
            .await
            .map_err(|e| DomainError::generation(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DomainError::generation(format!(
                "server returned {}",
                response.status()
            )));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| DomainError::generation(format!("bad response body: {e}")))?;

        Ok(body.content)
    }
}
