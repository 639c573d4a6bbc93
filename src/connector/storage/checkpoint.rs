//! Durable record of source files already ingested (or permanently skipped).

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use tracing::info;

use crate::domain::DomainError;

/// Set of root-relative source paths, persisted as newline-delimited text.
///
/// A path enters the set only after every chunk of the file has been embedded
/// and flushed, or after a terminal extraction failure; either way the file
/// is never picked up again.
pub struct CheckpointSet {
    path: PathBuf,
    entries: HashSet<String>,
}

impl CheckpointSet {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        let mut entries = HashSet::new();

        match File::open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line?;
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        entries.insert(trimmed.to_string());
                    }
                }
                info!("Loaded {} checkpointed files", entries.len());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(Self { path, entries })
    }

    pub fn contains(&self, rel_path: &str) -> bool {
        self.entries.contains(rel_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a path and rewrite the checkpoint file.
    pub fn insert(&mut self, rel_path: &str) -> Result<(), DomainError> {
        if !self.entries.insert(rel_path.to_string()) {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        for entry in &self.entries {
            writer.write_all(entry.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.txt");

        let mut set = CheckpointSet::load(&path).unwrap();
        assert!(set.is_empty());
        set.insert("guides/burns.txt").unwrap();
        set.insert("manuals/cpr.pdf").unwrap();

        let reloaded = CheckpointSet::load(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("guides/burns.txt"));
        assert!(!reloaded.contains("other.txt"));
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_files.txt");

        let mut set = CheckpointSet::load(&path).unwrap();
        set.insert("a.txt").unwrap();
        set.insert("a.txt").unwrap();
        assert_eq!(set.len(), 1);
    }
}
