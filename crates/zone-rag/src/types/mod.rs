//! Core data types for zone queries

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, DocumentRef, ExtractedText, RawDocument, ZoneCode};
pub use query::{Query, QueryPreset};
pub use response::{Answer, QueryResponse};
