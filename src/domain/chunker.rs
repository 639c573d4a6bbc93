//! Overlapping-window text chunking for embedding.
//!
//! Pure functions: the ingestion pipeline feeds extracted document text in
//! and gets an ordered sequence of windows back.

/// Chunking parameters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    /// Target window length in bytes.
    pub chunk_size: usize,
    /// Overlap carried from the end of one window into the next.
    pub overlap: usize,
    /// How far before the target boundary to look for a sentence break.
    pub lookback: usize,
    /// Windows shorter than this are noise and never indexed.
    pub min_len: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2000,
            overlap: 200,
            lookback: 100,
            min_len: 100,
        }
    }
}

/// Find a valid char boundary at or before the given byte index.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Find a valid char boundary at or after the given byte index.
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Split `text` into ordered, overlapping windows covering the whole input.
///
/// Each window ends at the nearest `". "` within `lookback` bytes of the
/// target boundary when one exists, otherwise at the fixed size. Start
/// offsets are strictly increasing: when the overlap would step a window
/// back to (or before) its predecessor's start, the cursor falls back to a
/// fixed stride so the loop always terminates, even with `overlap >=
/// chunk_size`.
pub fn split(text: &str, cfg: &ChunkerConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    if text.is_empty() {
        return chunks;
    }

    let mut start = 0;
    while start < text.len() {
        let raw_end = (start + cfg.chunk_size).min(text.len());
        let mut end = floor_char_boundary(text, raw_end);

        // Prefer a sentence terminator near the target boundary.
        if end < text.len() {
            if let Some(period) = text[..end].rfind(". ") {
                if period + 2 > start && period + 2 + cfg.lookback > start + cfg.chunk_size {
                    end = period + 2;
                }
            }
        }

        chunks.push(text[start..end].to_string());

        if end >= text.len() {
            break;
        }

        let next = ceil_char_boundary(text, end.saturating_sub(cfg.overlap));
        start = if next > start {
            next
        } else {
            // Overlap swallowed the whole window; advance by a fixed stride.
            ceil_char_boundary(text, start + cfg.chunk_size.max(1))
        };
    }

    chunks
}

/// Split and drop windows shorter than `cfg.min_len` bytes.
pub fn chunk(text: &str, cfg: &ChunkerConfig) -> Vec<String> {
    let mut chunks = split(text, cfg);
    chunks.retain(|c| c.len() >= cfg.min_len);
    chunks
}
