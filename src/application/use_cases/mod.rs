mod ingest;
mod query;

pub use ingest::{IngestionPipeline, POLL_INTERVAL};
pub use query::QueryUseCase;
