use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Corrupt index: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Extraction(_))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }

    /// HTTP status code this error maps to at the connection boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Protocol(_) => 400,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::ResourceLimit(_) => 413,
            Self::RateLimited(_) => 429,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_at_the_boundary() {
        assert_eq!(DomainError::protocol("x").status_code(), 400);
        assert_eq!(DomainError::forbidden("x").status_code(), 403);
        assert_eq!(DomainError::not_found("x").status_code(), 404);
        assert_eq!(DomainError::resource_limit("x").status_code(), 413);
        assert_eq!(DomainError::rate_limited("x").status_code(), 429);
        assert_eq!(DomainError::generation("x").status_code(), 500);
        assert_eq!(DomainError::corrupt("x").status_code(), 500);
    }
}
