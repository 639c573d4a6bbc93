//! Brute-force vector index with exact top-k search and binary persistence.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::domain::DomainError;

/// Append-only store of fixed-dimension `f32` vectors.
///
/// Search is an exact linear scan over squared L2 distance; no approximation,
/// no normalization. Rows are never reordered or deleted, so a row index is a
/// stable handle for the lifetime of the index.
#[derive(Debug)]
pub struct VectorIndex {
    data: Vec<f32>,
    dimension: usize,
}

/// Max-heap entry: the worst candidate sits on top so it can be evicted.
struct Candidate {
    dist: f32,
    row: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.row == other.row
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Primary: larger distance is "greater" (worse). Ties: larger row is
        // worse, so the first-encountered row survives eviction.
        self.dist
            .total_cmp(&other.dist)
            .then(self.row.cmp(&other.row))
    }
}

impl VectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            data: Vec::new(),
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Append rows in order. Vector dimension is a caller contract; rows are
    /// taken as-is with no deduplication or validation.
    pub fn add_batch(&mut self, vectors: &[Vec<f32>]) {
        for vector in vectors {
            debug_assert_eq!(vector.len(), self.dimension);
            self.data.extend_from_slice(vector);
        }
    }

    /// Drop all rows at or past `rows` (corruption repair).
    pub fn truncate(&mut self, rows: usize) {
        self.data.truncate(rows * self.dimension);
    }

    /// Exact top-k: up to `min(k, len)` `(row, squared_l2)` pairs in
    /// non-decreasing distance order, ties broken by first-encountered row.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        if k == 0 || self.is_empty() {
            return Vec::new();
        }

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        for (row, chunk) in self.data.chunks_exact(self.dimension).enumerate() {
            let mut dist = 0.0f32;
            for (a, b) in query.iter().zip(chunk) {
                let diff = a - b;
                dist += diff * diff;
            }
            heap.push(Candidate { dist, row });
            if heap.len() > k {
                heap.pop();
            }
        }

        let mut results: Vec<(usize, f32)> =
            heap.into_iter().map(|c| (c.row, c.dist)).collect();
        results.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        results
    }

    /// Write `[count:i32][dimension:i32][count*dimension f32]`, little-endian,
    /// row-major. No version or checksum field; the layout is fixed.
    pub fn save(&self, path: &Path) -> Result<(), DomainError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let count = self.len() as i32;
        writer.write_all(&count.to_le_bytes())?;
        writer.write_all(&(self.dimension as i32).to_le_bytes())?;
        for value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()?;

        debug!("Saved {} vectors to {}", count, path.display());
        Ok(())
    }

    /// Load an index saved by [`save`](Self::save). A missing file yields an
    /// empty index; a truncated or size-mismatched file is reported as
    /// [`DomainError::Corrupt`], never a panic.
    pub fn load(path: &Path, dimension: usize) -> Result<Self, DomainError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No existing index at {}", path.display());
                return Ok(Self::new(dimension));
            }
            Err(e) => return Err(e.into()),
        };
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut header = [0u8; 8];
        reader.read_exact(&mut header).map_err(|_| {
            DomainError::corrupt(format!("{}: truncated header", path.display()))
        })?;
        let count = i32::from_le_bytes(header[0..4].try_into().unwrap());
        let file_dim = i32::from_le_bytes(header[4..8].try_into().unwrap());

        if count < 0 || file_dim <= 0 || file_dim as usize != dimension {
            return Err(DomainError::corrupt(format!(
                "{}: bad header (count={}, dimension={}, expected dimension {})",
                path.display(),
                count,
                file_dim,
                dimension
            )));
        }

        // The header counts come from untrusted bytes; check them against
        // the actual file size before allocating anything. This also catches
        // truncated bodies and trailing data in one place.
        let expected = count as u64 * dimension as u64;
        if file_len != 8 + expected * 4 {
            return Err(DomainError::corrupt(format!(
                "{}: header claims {} rows of dimension {} but file is {} bytes",
                path.display(),
                count,
                dimension,
                file_len
            )));
        }

        let expected = expected as usize;
        let mut data = Vec::with_capacity(expected);
        let mut buf = [0u8; 4];
        for _ in 0..expected {
            reader.read_exact(&mut buf).map_err(|_| {
                DomainError::corrupt(format!(
                    "{}: truncated body, expected {} values",
                    path.display(),
                    expected
                ))
            })?;
            data.push(f32::from_le_bytes(buf));
        }

        info!("Loaded {} vectors from {}", count, path.display());
        Ok(Self { data, dimension })
    }
}
