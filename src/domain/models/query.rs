use serde::{Deserialize, Serialize};

use super::SearchMatch;

/// Body of `POST /query`.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default = "default_use_context")]
    pub use_context: bool,
}

fn default_use_context() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub matches: Vec<SearchMatch>,
    pub conversation_id: String,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub documents_indexed: usize,
}
