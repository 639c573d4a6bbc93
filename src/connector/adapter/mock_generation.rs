use async_trait::async_trait;

use crate::application::GenerationService;
use crate::domain::DomainError;

/// Canned generation for tests and offline development.
pub struct MockGeneration {
    answer: String,
}

impl MockGeneration {
    pub fn new() -> Self {
        Self {
            answer: "This is a mock answer.".to_string(),
        }
    }

    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
        }
    }
}

impl Default for MockGeneration {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationService for MockGeneration {
    async fn generate(&self, _prompt: &str) -> Result<String, DomainError> {
        Ok(self.answer.clone())
    }
}
