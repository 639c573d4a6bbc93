use std::path::PathBuf;

use async_trait::async_trait;
use tracing::warn;

use crate::application::{Asset, AssetService};
use crate::domain::DomainError;

/// Serves files from a public directory with a canonical-path traversal
/// guard: the resolved file must still live under the canonicalized root or
/// the request is Forbidden.
pub struct PublicDirAssets {
    root: PathBuf,
}

impl PublicDirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn content_type(path: &std::path::Path) -> &'static str {
        match path.extension().and_then(|e| e.to_str()) {
            Some("html") => "text/html",
            Some("css") => "text/css",
            Some("js") => "application/javascript",
            Some("json") => "application/json",
            Some("pdf") => "application/pdf",
            _ => "text/plain",
        }
    }
}

#[async_trait]
impl AssetService for PublicDirAssets {
    async fn resolve(&self, path: &str) -> Result<Asset, DomainError> {
        let rel = match path {
            "/" | "" => "index.html",
            p => p.trim_start_matches('/'),
        };

        let base = self
            .root
            .canonicalize()
            .map_err(|_| DomainError::not_found(path.to_string()))?;
        let requested = base.join(rel);

        let canonical = match requested.canonicalize() {
            Ok(p) => p,
            Err(_) => return Err(DomainError::not_found(path.to_string())),
        };
        if !canonical.starts_with(&base) {
            warn!("Traversal attempt blocked: {path}");
            return Err(DomainError::forbidden(path.to_string()));
        }
        if !canonical.is_file() {
            return Err(DomainError::not_found(path.to_string()));
        }

        let body = tokio::fs::read(&canonical).await?;
        Ok(Asset {
            content_type: Self::content_type(&canonical),
            body,
        })
    }
}
