//! Configuration for the zone query pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneRagConfig {
    /// Completion/embedding backend
    pub backend: BackendProvider,
    /// Document download settings
    pub fetch: FetchConfig,
    /// PDF decoding settings
    pub decoder: DecoderConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Evidence selection configuration
    pub retrieval: RetrievalConfig,
    /// Settings shared by every completion backend
    pub llm: LlmConfig,
    /// OpenAI-compatible endpoint settings
    pub openai: OpenAiConfig,
    /// Ollama endpoint settings
    pub ollama: OllamaConfig,
    /// Extra or overriding zone code -> document URL entries
    pub zones: BTreeMap<String, String>,
}

/// Backend provider selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// OpenAI-compatible HTTP API (requires a credential)
    #[default]
    OpenAi,
    /// Local Ollama server
    Ollama,
}

/// Document download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header sent with document requests
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("zone-rag/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which PDF decoder to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    /// In-process lopdf with pdf-extract fallback
    #[default]
    Native,
    /// poppler's `pdftotext` tool
    Pdftotext,
}

/// PDF decoding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub kind: DecoderKind,
    /// Upper bound on a single decode in seconds
    pub decode_timeout_secs: u64,
    /// Path or name of the pdftotext executable
    pub pdftotext_path: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            kind: DecoderKind::Native,
            decode_timeout_secs: 60,
            pdftotext_path: "pdftotext".to_string(),
        }
    }
}

impl DecoderConfig {
    pub fn decode_timeout(&self) -> Duration {
        Duration::from_secs(self.decode_timeout_secs)
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Chunk length in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// How evidence is selected for a question
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreference {
    /// Retrieval when an embedding capability is configured, truncation otherwise
    #[default]
    Auto,
    /// Always chunk-and-retrieve
    Retrieval,
    /// Always take a prefix of the document
    Truncation,
}

impl std::str::FromStr for StrategyPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "retrieval" => Ok(Self::Retrieval),
            "truncation" => Ok(Self::Truncation),
            other => Err(Error::config(format!(
                "unknown strategy '{}' (expected auto, retrieval or truncation)",
                other
            ))),
        }
    }
}

/// Evidence selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub strategy: StrategyPreference,
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Prefix length used by the truncation strategy
    pub max_context_chars: usize,
    /// Fall back to truncation when index construction fails
    pub allow_fallback: bool,
    /// Cut truncated evidence at a sentence boundary when one is near the limit
    pub boundary_aware_truncation: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyPreference::Auto,
            top_k: 3,
            max_context_chars: 8000,
            allow_fallback: true,
            boundary_aware_truncation: false,
        }
    }
}

/// Settings shared by completion backends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in a generated answer
    pub max_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Build an embedding capability (enables retrieval)
    pub enable_embeddings: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 512,
            timeout_secs: 120,
            enable_embeddings: true,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// OpenAI-compatible API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API root, including the version segment
    pub base_url: String,
    /// Completion model name
    pub generate_model: String,
    /// Embedding model name
    pub embed_model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            generate_model: "gpt-3.5-turbo-instruct".to_string(),
            embed_model: "text-embedding-ada-002".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl OpenAiConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        self.api_key_from(|key| std::env::var(key).ok())
    }

    /// Read the API key through a custom variable lookup
    pub fn api_key_from<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(&self.api_key_env) {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::config(format!(
                "{} environment variable not set",
                self.api_key_env
            ))),
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Embedding model name
    pub embed_model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "phi3".to_string(),
            embed_model: "nomic-embed-text".to_string(),
        }
    }
}

impl ZoneRagConfig {
    /// Default config file location (`<config dir>/zone-rag/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("zone-rag").join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location when it exists,
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("invalid config: {}", e)))
    }

    /// Apply `ZONE_RAG_MODEL`, `ZONE_RAG_BASE_URL` and `ZONE_RAG_STRATEGY`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("ZONE_RAG_MODEL") {
            match self.backend {
                BackendProvider::OpenAi => self.openai.generate_model = model,
                BackendProvider::Ollama => self.ollama.generate_model = model,
            }
        }
        if let Some(url) = lookup("ZONE_RAG_BASE_URL") {
            match self.backend {
                BackendProvider::OpenAi => self.openai.base_url = url,
                BackendProvider::Ollama => self.ollama.base_url = url,
            }
        }
        if let Some(strategy) = lookup("ZONE_RAG_STRATEGY") {
            self.retrieval.strategy = strategy.parse()?;
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be greater than zero"));
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            return Err(Error::config(format!(
                "chunking.chunk_overlap ({}) must be less than chunking.chunk_size ({})",
                chunking.chunk_overlap, chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be greater than zero"));
        }
        if self.retrieval.max_context_chars == 0 {
            return Err(Error::config(
                "retrieval.max_context_chars must be greater than zero",
            ));
        }
        if self.fetch.timeout_secs == 0 || self.llm.timeout_secs == 0 {
            return Err(Error::config("timeouts must be greater than zero"));
        }
        if self.decoder.decode_timeout_secs == 0 {
            return Err(Error::config("decoder.decode_timeout_secs must be greater than zero"));
        }
        for (zone, url) in &self.zones {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::config(format!(
                    "zone {} has a non-HTTP document URL: {}",
                    zone, url
                )));
            }
        }
        Ok(())
    }
}
