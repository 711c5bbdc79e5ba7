//! In-memory vector index over one zone's chunks

use crate::error::{Error, Result};
use crate::ingestion::TextChunker;
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, ExtractedText, ZoneCode};

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity to the question
    pub similarity: f32,
}

/// Chunks of a zone document paired with their embeddings
///
/// Immutable once built.
#[derive(Debug)]
pub struct ZoneIndex {
    zone: ZoneCode,
    chunks: Vec<Chunk>,
    embeddings: Vec<Vec<f32>>,
    content_hash: String,
}

impl ZoneIndex {
    /// Chunk `text` and embed every chunk
    ///
    /// Any failure here is an `Error::Index`.
    pub async fn build(
        text: &ExtractedText,
        chunker: &TextChunker,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let chunks = chunker.split(&text.zone, &text.text);
        if chunks.is_empty() {
            return Err(Error::index(format!(
                "no chunks produced for zone {}",
                text.zone
            )));
        }

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_batch(&contents).await.map_err(as_index_error)?;

        if embeddings.len() != chunks.len() {
            return Err(Error::index(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        if let Some(dim) = embeddings.first().map(Vec::len) {
            if dim == 0 || embeddings.iter().any(|e| e.len() != dim) {
                return Err(Error::index("embeddings have inconsistent dimensions"));
            }
        }

        tracing::info!(
            "Built index for zone {}: {} chunks via {}",
            text.zone,
            chunks.len(),
            embedder.name()
        );

        Ok(Self {
            zone: text.zone.clone(),
            chunks,
            embeddings,
            content_hash: text.content_hash.clone(),
        })
    }

    /// Embed `question` and return the `k` most similar chunks
    pub async fn search(
        &self,
        question: &str,
        k: usize,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Vec<ScoredChunk>> {
        let query = embedder.embed(question).await.map_err(as_index_error)?;
        self.search_by_embedding(&query, k)
    }

    /// Top `k` chunks by cosine similarity, highest first
    ///
    /// Ties keep chunk order.
    pub fn search_by_embedding(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if let Some(dim) = self.embeddings.first().map(Vec::len) {
            if query.len() != dim {
                return Err(Error::index(format!(
                    "query embedding has {} dimensions, index has {}",
                    query.len(),
                    dim
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(i, emb)| (i, cosine_similarity(query, emb)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, similarity)| ScoredChunk {
                chunk: self.chunks[i].clone(),
                similarity,
            })
            .collect())
    }

    pub fn zone(&self) -> &ZoneCode {
        &self.zone
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Hash of the text the index was built from
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn as_index_error(err: Error) -> Error {
    match err {
        Error::Index(_) => err,
        other => Error::index(other.to_string()),
    }
}

/// Cosine similarity; zero when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
