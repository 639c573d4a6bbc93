use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::application::{EmbeddingService, ExtractionService};
use crate::connector::storage::{CheckpointSet, CorpusStore};
use crate::domain::chunker::{self, ChunkerConfig};
use crate::domain::{DocumentRow, DomainError};

/// Source extensions picked up by discovery.
const SUPPORTED_EXTENSIONS: [&str; 2] = ["txt", "pdf"];
/// Extracted text past this many characters is truncated to bound memory.
const MAX_TEXT_CHARS: usize = 500_000;
/// Chunks embedded and flushed together.
const EMBED_BATCH_SIZE: usize = 50;
/// Pause between flushed batches so ingestion never starves the serving path.
const BATCH_PACING: Duration = Duration::from_millis(500);

/// How long to sleep between discovery cycles.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Periodic background ingestion: discover new source files, extract and
/// chunk them, embed in batches, flush the corpus after every batch, and
/// checkpoint each file once it is fully processed (or permanently failed).
pub struct IngestionPipeline {
    sources_dir: PathBuf,
    corpus: Arc<CorpusStore>,
    checkpoints: Mutex<CheckpointSet>,
    embedding_service: Arc<dyn EmbeddingService>,
    extraction_service: Arc<dyn ExtractionService>,
    chunker_config: ChunkerConfig,
    poll_interval: Duration,
}

impl IngestionPipeline {
    pub fn new(
        sources_dir: impl Into<PathBuf>,
        corpus: Arc<CorpusStore>,
        checkpoints: CheckpointSet,
        embedding_service: Arc<dyn EmbeddingService>,
        extraction_service: Arc<dyn ExtractionService>,
    ) -> Self {
        Self {
            sources_dir: sources_dir.into(),
            corpus,
            checkpoints: Mutex::new(checkpoints),
            embedding_service,
            extraction_service,
            chunker_config: ChunkerConfig::default(),
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_chunker_config(mut self, config: ChunkerConfig) -> Self {
        self.chunker_config = config;
        self
    }

    /// Perpetual loop: one cycle, then sleep, until cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "Ingestion watching {} every {:?}",
            self.sources_dir.display(),
            self.poll_interval
        );
        loop {
            if let Err(e) = self.run_cycle().await {
                warn!("Ingestion cycle failed: {e}");
            }
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Ingestion stopping");
                    return;
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// One discovery/ingest pass. Per-file failures are logged and isolated;
    /// only environmental errors (an unreadable checkpoint file) abort the
    /// cycle itself.
    pub async fn run_cycle(&self) -> Result<(), DomainError> {
        let new_files = self.discover().await;
        if new_files.is_empty() {
            return Ok(());
        }
        info!("Found {} new files to ingest", new_files.len());

        for (full_path, rel_path) in new_files {
            match self.ingest_file(&full_path, &rel_path).await {
                Ok(chunks) => {
                    info!("Ingested {rel_path} ({chunks} chunks)");
                    self.checkpoint(&rel_path).await?;
                }
                Err(e) if e.is_extraction() => {
                    // Terminal: mark the file done so it is never retried.
                    warn!("Extraction failed for {rel_path}, skipping permanently: {e}");
                    self.checkpoint(&rel_path).await?;
                }
                Err(e) => {
                    // Transient (I/O, embedding flush): leave uncheckpointed
                    // so the next cycle retries, and move on.
                    warn!("Failed to ingest {rel_path}: {e}");
                }
            }
        }

        info!("Ingestion cycle complete, corpus at {} documents", self.corpus.len().await);
        Ok(())
    }

    /// Enumerate supported files under the sources root and diff against the
    /// checkpoint set. Returns `(absolute, root-relative)` pairs.
    async fn discover(&self) -> Vec<(PathBuf, String)> {
        let checkpoints = self.checkpoints.lock().await;
        let mut found = Vec::new();

        for entry in WalkDir::new(&self.sources_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let ext = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("");
            if !SUPPORTED_EXTENSIONS.contains(&ext) {
                continue;
            }

            let rel_path = entry
                .path()
                .strip_prefix(&self.sources_dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();

            if !checkpoints.contains(&rel_path) {
                found.push((entry.path().to_path_buf(), rel_path));
            }
        }

        found
    }

    /// Extract, chunk, embed, and flush one file. Returns the number of
    /// chunks indexed.
    async fn ingest_file(&self, path: &Path, rel_path: &str) -> Result<usize, DomainError> {
        debug!("Processing {rel_path}");
        let mut text = self.extract(path).await?;

        if text.chars().count() > MAX_TEXT_CHARS {
            let cut: usize = text.chars().take(MAX_TEXT_CHARS).map(|c| c.len_utf8()).sum();
            info!(
                "Truncating {rel_path} from {} to {MAX_TEXT_CHARS} characters",
                text.chars().count()
            );
            text.truncate(cut);
        }

        let chunks = chunker::chunk(&text, &self.chunker_config);
        debug!("Split {rel_path} into {} chunks", chunks.len());

        let mut total = 0;
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let mut vectors = Vec::with_capacity(batch.len());
            let mut rows = Vec::with_capacity(batch.len());
            for chunk in batch {
                // Embedding degrades to a zero vector rather than failing,
                // so a flaky collaborator never aborts the batch.
                let vector = self.embedding_service.embed(chunk).await?;
                vectors.push(vector);
                rows.push(DocumentRow::new(rel_path, chunk.clone()));
            }

            self.corpus.append_and_flush(&vectors, rows).await?;
            total += batch.len();

            if batch.len() == EMBED_BATCH_SIZE {
                tokio::time::sleep(BATCH_PACING).await;
            }
        }

        Ok(total)
    }

    async fn extract(&self, path: &Path) -> Result<String, DomainError> {
        let is_plain_text = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "txt")
            .unwrap_or(false);

        let text = if is_plain_text {
            // Undecodable bytes will not get better on retry; treat them
            // like any other terminal extraction failure.
            let bytes = tokio::fs::read(path).await?;
            String::from_utf8(bytes).map_err(|_| {
                DomainError::extraction(format!("{}: not valid UTF-8", path.display()))
            })?
        } else {
            self.extraction_service.extract(path).await?
        };

        if text.trim().is_empty() {
            return Err(DomainError::extraction(format!(
                "{}: empty extraction result",
                path.display()
            )));
        }
        Ok(text)
    }

    async fn checkpoint(&self, rel_path: &str) -> Result<(), DomainError> {
        self.checkpoints.lock().await.insert(rel_path)
    }
}
