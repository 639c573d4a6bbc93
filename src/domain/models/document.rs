use serde::{Deserialize, Serialize};

/// One indexed chunk of a source document.
///
/// Row *i* of the metadata file pairs with row *i* of the vector index; the
/// two are appended together and never reordered or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub filename: String,
    pub text: String,
}

impl DocumentRow {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
        }
    }
}

/// A retrieval hit surfaced to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    pub filename: String,
    pub text: String,
    pub score: f32,
}
