pub mod application;
pub mod connector;
pub mod domain;

pub use application::{
    Asset, AssetService, EmbeddingService, ExtractionService, GenerationService,
    IngestionPipeline, QueryUseCase,
};

pub use connector::{
    CheckpointSet, Container, ContainerConfig, CorpusStore, LlamaEmbeddingClient,
    LlamaGenerationClient, MockEmbedding, MockGeneration, PublicDirAssets, RateLimiter,
    RequestFramer, Response, Router, Server, SessionStore, TikaExtractionClient, VectorIndex,
};

pub use domain::{
    chunker::ChunkerConfig, DocumentRow, DomainError, QueryRequest, QueryResponse, SearchMatch,
    StatusResponse,
};
