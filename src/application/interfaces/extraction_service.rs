use std::path::Path;

use async_trait::async_trait;

use crate::domain::DomainError;

/// Turns raw document bytes into plain text.
///
/// Non-text formats (PDF) go through an external extraction server. An empty
/// result is an extraction failure; the caller checkpoints the file as
/// permanently skipped rather than retrying it forever.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, DomainError>;
}
