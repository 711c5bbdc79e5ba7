//! Completion provider trait for answer synthesis

use async_trait::async_trait;

use crate::error::Result;

/// Trait for single-shot text completion
///
/// Implementations:
/// - `OpenAiClient`: OpenAI-compatible `/completions` endpoint
/// - `OllamaClient`: Local Ollama server (`/api/generate`)
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt` once. Never retries.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
