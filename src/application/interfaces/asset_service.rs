use async_trait::async_trait;

use crate::domain::DomainError;

/// A resolved static asset.
#[derive(Debug)]
pub struct Asset {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Resolves `GET` paths that match no defined route.
///
/// Static asset serving is a collaborator concern; the dispatcher only needs
/// the body, a content type, and the error taxonomy (`Forbidden` for
/// traversal attempts, `NotFound` for everything missing).
#[async_trait]
pub trait AssetService: Send + Sync {
    async fn resolve(&self, path: &str) -> Result<Asset, DomainError>;
}
