mod document;
mod query;

pub use document::{DocumentRow, SearchMatch};
pub use query::{QueryRequest, QueryResponse, StatusResponse};
