//! Fixed-window text chunking with overlap

use crate::error::{Error, Result};
use crate::types::{Chunk, ZoneCode};

/// Text chunker with configurable size and overlap
///
/// Windows are measured in chars. Consecutive chunks share exactly
/// `overlap` chars, so the text can be rebuilt from the chunk sequence.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker. Requires `0 <= overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk size must be greater than zero"));
        }
        if overlap >= chunk_size {
            return Err(Error::config(format!(
                "chunk overlap ({}) must be less than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into overlapping windows
    ///
    /// Deterministic: identical input always yields identical chunks.
    pub fn split(&self, zone: &ZoneCode, text: &str) -> Vec<Chunk> {
        // Byte offset of every char, plus the end of the string
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let total = boundaries.len();
        boundaries.push(text.len());

        let stride = self.chunk_size - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;

        while start < total {
            let end = (start + self.chunk_size).min(total);
            chunks.push(Chunk {
                zone: zone.clone(),
                index: chunks.len() as u32,
                content: text[boundaries[start]..boundaries[end]].to_string(),
                char_start: start,
                char_end: end,
            });

            if end == total {
                break;
            }
            start += stride;
        }

        tracing::debug!(
            "Split {} chars into {} chunks for zone {} (size {}, overlap {})",
            total,
            chunks.len(),
            zone,
            self.chunk_size,
            self.overlap
        );

        chunks
    }
}

/// Rebuild the original text from a full chunk sequence produced with `overlap`
pub fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(&chunk.content);
        } else {
            text.extend(chunk.content.chars().skip(overlap));
        }
    }
    text
}
