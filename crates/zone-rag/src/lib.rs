//! zone-rag: planning-rule question answering over zone regulation PDFs
//!
//! A query resolves a zone code to its regulation document, downloads and
//! decodes the PDF, selects bounded evidence (a prefix of the text, or the
//! chunks most similar to the question from a per-zone index) and asks a
//! completion service for an answer grounded in that evidence.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod registry;
pub mod retrieval;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ZoneRagConfig;
pub use error::{Error, Result};
pub use pipeline::{Capabilities, QueryOutcome, QueryPipeline, QueryState};
pub use registry::ZoneRegistry;
pub use types::{
    document::{Chunk, DocumentRef, ExtractedText, RawDocument, ZoneCode},
    query::{Query, QueryPreset},
    response::{Answer, QueryResponse},
};
