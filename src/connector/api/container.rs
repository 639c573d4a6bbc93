use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::application::{
    AssetService, EmbeddingService, ExtractionService, GenerationService, IngestionPipeline,
    QueryUseCase,
};
use crate::connector::adapter::{
    LlamaEmbeddingClient, LlamaGenerationClient, MockEmbedding, MockGeneration, PublicDirAssets,
    TikaExtractionClient,
};
use crate::connector::storage::{CheckpointSet, CorpusStore};

use super::rate_limit::RateLimiter;
use super::session::SessionStore;

pub struct ContainerConfig {
    pub data_dir: String,
    pub sources_dir: String,
    pub public_dir: String,
    /// Use deterministic in-process collaborators instead of HTTP services.
    pub mock_services: bool,
}

/// Owns every shared component and wires the use cases; the dispatcher and
/// the ingestion task both borrow from here instead of global state.
pub struct Container {
    corpus: Arc<CorpusStore>,
    sessions: Arc<SessionStore>,
    rate_limiter: Arc<RateLimiter>,
    assets: Arc<dyn AssetService>,
    query_use_case: Arc<QueryUseCase>,
    ingestion: Arc<IngestionPipeline>,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Result<Self> {
        let data_dir = PathBuf::from(&config.data_dir);

        let embedding_service: Arc<dyn EmbeddingService> = if config.mock_services {
            debug!("Using mock embedding service");
            Arc::new(MockEmbedding::new())
        } else {
            Arc::new(LlamaEmbeddingClient::from_env())
        };
        let generation_service: Arc<dyn GenerationService> = if config.mock_services {
            debug!("Using mock generation service");
            Arc::new(MockGeneration::new())
        } else {
            Arc::new(LlamaGenerationClient::from_env())
        };
        let extraction_service: Arc<dyn ExtractionService> =
            Arc::new(TikaExtractionClient::from_env());

        let corpus = Arc::new(CorpusStore::load(
            data_dir.join("index.bin"),
            data_dir.join("metadata.jsonl"),
            embedding_service.dimensions(),
        )?);
        let checkpoints = CheckpointSet::load(data_dir.join("processed_files.txt"))?;

        let sessions = Arc::new(SessionStore::new());
        let rate_limiter = Arc::new(RateLimiter::new());
        let assets: Arc<dyn AssetService> = Arc::new(PublicDirAssets::new(&config.public_dir));

        let query_use_case = Arc::new(QueryUseCase::new(
            Arc::clone(&corpus),
            Arc::clone(&sessions),
            Arc::clone(&embedding_service),
            Arc::clone(&generation_service),
        ));

        let ingestion = Arc::new(IngestionPipeline::new(
            &config.sources_dir,
            Arc::clone(&corpus),
            checkpoints,
            embedding_service,
            extraction_service,
        ));

        Ok(Self {
            corpus,
            sessions,
            rate_limiter,
            assets,
            query_use_case,
            ingestion,
        })
    }

    pub fn corpus(&self) -> &Arc<CorpusStore> {
        &self.corpus
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn assets(&self) -> &Arc<dyn AssetService> {
        &self.assets
    }

    pub fn query_use_case(&self) -> &Arc<QueryUseCase> {
        &self.query_use_case
    }

    pub fn ingestion(&self) -> &Arc<IngestionPipeline> {
        &self.ingestion
    }
}
