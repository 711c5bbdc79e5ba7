//! OpenAI-compatible completion and embedding client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{LlmConfig, OpenAiConfig};
use crate::error::{Error, Result, SynthesisErrorKind};

use super::completion::CompletionProvider;
use super::embedding::EmbeddingProvider;

/// Inputs per `/embeddings` request
const EMBED_BATCH_SIZE: usize = 96;

/// Client for `/completions` and `/embeddings` on an OpenAI-compatible API
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
    api_key: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl OpenAiClient {
    /// Create a client with an explicit API key
    pub fn new(config: &OpenAiConfig, llm: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(llm.timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key: api_key.into(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
        })
    }

    /// Create a client reading the key from the configured environment variable
    pub fn from_env(config: &OpenAiConfig, llm: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::new(config, llm, api_key)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn embed_request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.config.embed_model,
            input: inputs,
        };

        let response = self
            .client
            .post(self.endpoint("embeddings"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::index(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::index(format!(
                "Embedding failed: HTTP {} - {}",
                status, body
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::index(format!("Failed to parse embedding response: {}", e)))?;

        if parsed.data.len() != inputs.len() {
            return Err(Error::index(format!(
                "Embedding response has {} vectors for {} inputs",
                parsed.data.len(),
                inputs.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.config.generate_model,
            prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::info!("Generating answer with model: {}", self.config.generate_model);

        let response = self
            .client
            .post(self.endpoint("completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(Error::from_service)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::synthesis(
                SynthesisErrorKind::ServiceUnavailable,
                format!("Generation failed: HTTP {} - {}", status, body),
            ));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            Error::synthesis(
                SynthesisErrorKind::InvalidResponse,
                format!("Failed to parse completion response: {}", e),
            )
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text)
            .ok_or_else(|| {
                Error::synthesis(
                    SynthesisErrorKind::InvalidResponse,
                    "completion response has no choices",
                )
            })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.generate_model
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::index("Embedding response was empty"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            embeddings.extend(self.embed_request(batch).await?);
        }
        Ok(embeddings)
    }

    fn name(&self) -> &str {
        "openai"
    }
}
