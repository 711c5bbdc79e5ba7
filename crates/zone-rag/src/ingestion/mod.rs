//! Document ingestion: download, decode, chunk

pub mod chunker;
pub mod decoder;
pub mod extractor;
pub mod fetcher;

pub use chunker::{reconstruct, TextChunker};
pub use decoder::{decoder_for, DocumentDecoder, PdfDecoder, PdftotextDecoder};
pub use extractor::TextExtractor;
pub use fetcher::{DocumentFetcher, HttpFetcher};
