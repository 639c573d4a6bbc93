mod asset_service;
mod embedding_service;
mod extraction_service;
mod generation_service;

pub use asset_service::{Asset, AssetService};
pub use embedding_service::EmbeddingService;
pub use extraction_service::ExtractionService;
pub use generation_service::GenerationService;
