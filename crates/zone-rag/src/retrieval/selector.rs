//! Evidence selection: prefix truncation or chunk retrieval

use std::future::Future;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::{RetrievalConfig, StrategyPreference};
use crate::error::{Error, Result};
use crate::ingestion::TextChunker;
use crate::providers::EmbeddingProvider;
use crate::types::{ExtractedText, ZoneCode};

use super::cache::{CacheOutcome, IndexCache};
use super::index::{ScoredChunk, ZoneIndex};

/// Separator between retrieved chunks in evidence text
const CHUNK_SEPARATOR: &str = "\n\n";

/// How evidence was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStrategy {
    Truncation,
    Retrieval,
}

impl std::fmt::Display for EvidenceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncation => write!(f, "truncation"),
            Self::Retrieval => write!(f, "retrieval"),
        }
    }
}

/// Bounded text handed to answer synthesis
#[derive(Debug, Clone)]
pub struct Evidence {
    pub text: String,
    pub strategy: EvidenceStrategy,
    /// Retrieved chunks in rank order (empty for truncation)
    pub chunks: Vec<ScoredChunk>,
    /// Retrieval failed and truncation was used instead
    pub fell_back: bool,
}

impl Evidence {
    fn from_hits(hits: Vec<ScoredChunk>) -> Self {
        let text = hits
            .iter()
            .map(|hit| hit.chunk.content.as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR);
        Self {
            text,
            strategy: EvidenceStrategy::Retrieval,
            chunks: hits,
            fell_back: false,
        }
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Keeps the first `max_chars` chars of a text
#[derive(Debug, Clone, Copy)]
pub struct Truncator {
    max_chars: usize,
    boundary_aware: bool,
}

impl Truncator {
    pub fn new(max_chars: usize, boundary_aware: bool) -> Self {
        Self {
            max_chars,
            boundary_aware,
        }
    }

    /// Prefix of at most `max_chars` chars; text that fits is returned whole
    pub fn truncate(&self, text: &str) -> String {
        let cut = match text.char_indices().nth(self.max_chars) {
            Some((byte_idx, _)) => byte_idx,
            None => return text.to_string(),
        };
        let window = &text[..cut];

        if self.boundary_aware {
            if let Some(end) = self.sentence_cut(window) {
                return window[..end].trim_end().to_string();
            }
        }
        window.to_string()
    }

    /// Byte offset of the last sentence start inside `window`, if it falls
    /// in the final quarter of the window
    fn sentence_cut(&self, window: &str) -> Option<usize> {
        let min_chars = self.max_chars - self.max_chars / 4;
        let (start, _) = window.split_sentence_bound_indices().last()?;
        if start == 0 || window[..start].chars().count() < min_chars {
            return None;
        }
        Some(start)
    }
}

/// Chooses and runs an evidence strategy for a question
pub struct EvidenceSelector {
    chunker: TextChunker,
    cache: Arc<IndexCache>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    truncator: Truncator,
    top_k: usize,
    allow_fallback: bool,
    strategy: EvidenceStrategy,
}

impl EvidenceSelector {
    /// Resolve the configured preference against the available capabilities
    ///
    /// Retrieval needs an embedding provider; without one the selector runs
    /// in truncation mode.
    pub fn new(
        chunker: TextChunker,
        cache: Arc<IndexCache>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: &RetrievalConfig,
    ) -> Self {
        let strategy = match (config.strategy, embedder.is_some()) {
            (StrategyPreference::Truncation, _) => EvidenceStrategy::Truncation,
            (StrategyPreference::Auto, true) | (StrategyPreference::Retrieval, true) => {
                EvidenceStrategy::Retrieval
            }
            (StrategyPreference::Retrieval, false) => {
                tracing::warn!("Retrieval requested without an embedding provider, using truncation");
                EvidenceStrategy::Truncation
            }
            (StrategyPreference::Auto, false) => EvidenceStrategy::Truncation,
        };

        Self {
            chunker,
            cache,
            embedder,
            truncator: Truncator::new(config.max_context_chars, config.boundary_aware_truncation),
            top_k: config.top_k,
            allow_fallback: config.allow_fallback,
            strategy,
        }
    }

    pub fn strategy(&self) -> EvidenceStrategy {
        self.strategy
    }

    pub fn cache(&self) -> &Arc<IndexCache> {
        &self.cache
    }

    /// Truncation strategy
    pub fn truncate(&self, text: &ExtractedText) -> Evidence {
        Evidence {
            text: self.truncator.truncate(&text.text),
            strategy: EvidenceStrategy::Truncation,
            chunks: Vec::new(),
            fell_back: false,
        }
    }

    /// Retrieval strategy
    ///
    /// `load_text` fetches and extracts the zone document. It runs only when
    /// the zone has no cached index, or when a failed retrieval falls back to
    /// truncation without text at hand. Errors from `load_text` itself are
    /// never masked by the fallback.
    pub async fn retrieve<F, Fut>(
        &self,
        zone: &ZoneCode,
        question: &str,
        load_text: F,
    ) -> Result<Evidence>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<ExtractedText>>,
    {
        let embedder = self
            .embedder
            .as_deref()
            .ok_or_else(|| Error::config("retrieval requires an embedding provider"))?;

        // Text loaded for a build that then failed, kept for the fallback
        let mut loaded: Option<ExtractedText> = None;
        let stash = &mut loaded;
        let load = &load_text;
        let chunker = &self.chunker;

        let built = self
            .cache
            .get_or_try_build(zone, || async move {
                let text = load().await?;
                match ZoneIndex::build(&text, chunker, embedder).await {
                    Ok(index) => Ok(index),
                    Err(e) => {
                        *stash = Some(text);
                        Err(e)
                    }
                }
            })
            .await;

        let search = match built {
            Ok((index, outcome)) => {
                if outcome == CacheOutcome::Hit {
                    tracing::debug!("Reusing cached index for zone {}", zone);
                }
                index.search(question, self.top_k, embedder).await
            }
            Err(e) => Err(e),
        };

        match search {
            Ok(hits) => {
                tracing::debug!("Retrieved {} chunks for zone {}", hits.len(), zone);
                Ok(Evidence::from_hits(hits))
            }
            Err(e) if e.is_index_error() && self.allow_fallback => {
                tracing::warn!("Retrieval failed for zone {} ({}), falling back to truncation", zone, e);
                let text = match loaded {
                    Some(text) => text,
                    None => load_text().await?,
                };
                let mut evidence = self.truncate(&text);
                evidence.fell_back = true;
                Ok(evidence)
            }
            Err(e) => Err(e),
        }
    }
}
