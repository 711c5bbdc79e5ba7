//! Provider abstractions for completion and embeddings
//!
//! Both backends implement both traits, so one client can serve the
//! synthesizer and the retrieval index.

pub mod completion;
pub mod embedding;
pub mod ollama;
pub mod openai;

pub use completion::CompletionProvider;
pub use embedding::EmbeddingProvider;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
