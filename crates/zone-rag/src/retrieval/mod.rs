//! Evidence selection over zone documents

pub mod cache;
pub mod index;
pub mod selector;

pub use cache::{CacheOutcome, IndexCache};
pub use index::{cosine_similarity, ScoredChunk, ZoneIndex};
pub use selector::{Evidence, EvidenceSelector, EvidenceStrategy, Truncator};
