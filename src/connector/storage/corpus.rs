//! Paired vector index + document metadata with durable flushing.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{DocumentRow, DomainError, SearchMatch};

use super::vector_index::VectorIndex;

struct CorpusInner {
    index: VectorIndex,
    documents: Vec<DocumentRow>,
}

/// The serving corpus: vector rows and their document metadata, guarded by a
/// single mutex so no reader ever observes one side longer than the other.
///
/// Mutations are append-only and flow exclusively through
/// [`append_and_flush`](Self::append_and_flush), which persists both files
/// before returning; a crash can lose at most the one in-flight batch.
pub struct CorpusStore {
    inner: Mutex<CorpusInner>,
    index_path: PathBuf,
    metadata_path: PathBuf,
}

impl CorpusStore {
    /// Load the persisted pair, creating an empty corpus when neither file
    /// exists yet.
    ///
    /// The two files are written sequentially, so a crash between them can
    /// desynchronize the row counts. Repair policy: truncate both sides to
    /// the common prefix, log both counts, and rewrite the repaired pair.
    /// The persisted count therefore never exceeds the logical count.
    pub fn load(
        index_path: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
        dimension: usize,
    ) -> Result<Self, DomainError> {
        let index_path = index_path.into();
        let metadata_path = metadata_path.into();

        let mut index = VectorIndex::load(&index_path, dimension)?;
        let mut documents = read_metadata(&metadata_path)?;

        if index.len() != documents.len() {
            let keep = index.len().min(documents.len());
            warn!(
                "Corpus desync: {} vector rows vs {} document rows; truncating both to {}",
                index.len(),
                documents.len(),
                keep
            );
            index.truncate(keep);
            documents.truncate(keep);

            index.save(&index_path)?;
            write_metadata(&metadata_path, &documents)?;
        }

        info!("Corpus ready with {} documents", documents.len());
        Ok(Self {
            inner: Mutex::new(CorpusInner { index, documents }),
            index_path,
            metadata_path,
        })
    }

    /// In-memory corpus for tests; `append_and_flush` still writes the paths.
    pub fn empty(
        index_path: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
        dimension: usize,
    ) -> Self {
        Self {
            inner: Mutex::new(CorpusInner {
                index: VectorIndex::new(dimension),
                documents: Vec::new(),
            }),
            index_path: index_path.into(),
            metadata_path: metadata_path.into(),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.documents.is_empty()
    }

    /// Exact top-k search resolved to document rows, all under one critical
    /// section so the row count and document list cannot diverge mid-read.
    pub async fn search(&self, query: &[f32], k: usize) -> Vec<SearchMatch> {
        let inner = self.inner.lock().await;
        inner
            .index
            .search(query, k)
            .into_iter()
            .filter_map(|(row, dist)| {
                inner.documents.get(row).map(|doc| SearchMatch {
                    filename: doc.filename.clone(),
                    text: doc.text.clone(),
                    score: 1.0 - dist / 100.0,
                })
            })
            .collect()
    }

    /// Append one embedded batch and persist both files before returning.
    /// The index file is written first, the metadata file second; the load
    /// repair policy assumes this ordering.
    pub async fn append_and_flush(
        &self,
        vectors: &[Vec<f32>],
        rows: Vec<DocumentRow>,
    ) -> Result<(), DomainError> {
        debug_assert_eq!(vectors.len(), rows.len());

        let mut inner = self.inner.lock().await;
        inner.index.add_batch(vectors);
        inner.documents.extend(rows);

        if let Some(dir) = self.index_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        inner.index.save(&self.index_path)?;
        write_metadata(&self.metadata_path, &inner.documents)?;

        debug!(
            "Flushed batch of {} rows, corpus now {} documents",
            vectors.len(),
            inner.documents.len()
        );
        Ok(())
    }
}

fn read_metadata(path: &Path) -> Result<Vec<DocumentRow>, DomainError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut documents = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: DocumentRow = serde_json::from_str(&line).map_err(|e| {
            DomainError::corrupt(format!("{}:{}: {}", path.display(), line_no + 1, e))
        })?;
        documents.push(row);
    }
    Ok(documents)
}

fn write_metadata(path: &Path, documents: &[DocumentRow]) -> Result<(), DomainError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for row in documents {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
