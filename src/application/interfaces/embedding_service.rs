use async_trait::async_trait;

use crate::domain::DomainError;

/// Turns text into a fixed-dimension vector.
///
/// The production implementation is an out-of-process model server; callers
/// must be able to rely on every returned vector having `dimensions()`
/// entries. Implementations degrade to an all-zero vector rather than
/// violating that contract.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    fn dimensions(&self) -> usize;
}
