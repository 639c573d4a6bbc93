mod checkpoint;
mod corpus;
mod vector_index;

pub use checkpoint::CheckpointSet;
pub use corpus::CorpusStore;
pub use vector_index::VectorIndex;
