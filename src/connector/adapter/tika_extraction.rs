use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::application::ExtractionService;
use crate::domain::DomainError;

pub const DEFAULT_TIKA_URL: &str = "http://tika:9998/tika";
/// Files past this size are refused outright instead of being shipped to the
/// extraction server.
const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Apache Tika client: `PUT` the raw file bytes, get plain text back.
///
/// Configure via `TIKA_URL`. An empty extraction result is a failure; the
/// pipeline checkpoints the file as skipped rather than indexing nothing.
pub struct TikaExtractionClient {
    client: reqwest::Client,
    url: String,
}

impl TikaExtractionClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }

    pub fn from_env() -> Self {
        let url = std::env::var("TIKA_URL").unwrap_or_else(|_| DEFAULT_TIKA_URL.to_string());
        Self::new(url)
    }

    fn content_type(path: &Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()) {
            Some("pdf") => "application/pdf",
            Some("html") | Some("htm") => "text/html",
            Some("txt") => "text/plain",
            _ => "application/octet-stream",
        }
    }
}

#[async_trait]
impl ExtractionService for TikaExtractionClient {
    async fn extract(&self, path: &Path) -> Result<String, DomainError> {
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(DomainError::extraction(format!(
                "{}: {} bytes exceeds extraction limit",
                path.display(),
                metadata.len()
            )));
        }

        let bytes = tokio::fs::read(path).await?;
        let response = self
            .client
            .put(&self.url)
            .header("Accept", "text/plain")
            .header("Content-Type", Self::content_type(path))
            .body(bytes)
            .send()
            .await
            .map_err(|e| DomainError::extraction(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(DomainError::extraction(format!(
                "server returned {} for {}",
                response.status(),
                path.display()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| DomainError::extraction(format!("bad response body: {e}")))?;

        debug!("Extracted {} characters from {}", text.len(), path.display());
        Ok(text)
    }
}
