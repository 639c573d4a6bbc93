mod llama_embedding;
mod llama_generation;
mod mock_embedding;
mod mock_generation;
mod public_assets;
mod tika_extraction;

pub use llama_embedding::LlamaEmbeddingClient;
pub use llama_generation::LlamaGenerationClient;
pub use mock_embedding::MockEmbedding;
pub use mock_generation::MockGeneration;
pub use public_assets::PublicDirAssets;
pub use tika_extraction::TikaExtractionClient;
