use async_trait::async_trait;

use crate::domain::DomainError;

/// Turns a prompt (context, history, question) into an answer.
///
/// Implementors encapsulate transport and vendor API details; a failed call
/// is a real error surfaced to the client, never a crash.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, DomainError>;
}
