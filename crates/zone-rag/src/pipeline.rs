//! Query orchestration: resolve, fetch, extract, select evidence, synthesize

use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{BackendProvider, ZoneRagConfig};
use crate::error::{Error, Result};
use crate::generation::AnswerSynthesizer;
use crate::ingestion::{
    decoder_for, DocumentDecoder, DocumentFetcher, HttpFetcher, TextChunker, TextExtractor,
};
use crate::providers::{CompletionProvider, EmbeddingProvider, OllamaClient, OpenAiClient};
use crate::registry::ZoneRegistry;
use crate::retrieval::{Evidence, EvidenceSelector, EvidenceStrategy, IndexCache};
use crate::types::{Answer, DocumentRef, ExtractedText, Query, QueryResponse, ZoneCode};

/// Stages a query moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    ResolvingZone,
    Fetching,
    Extracting,
    SelectingEvidence,
    Synthesizing,
    Done,
    Failed,
}

impl QueryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ResolvingZone => "resolving_zone",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::SelectingEvidence => "selecting_evidence",
            Self::Synthesizing => "synthesizing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// States entered by one query, plus how its evidence was chosen
struct QueryTrace {
    states: Mutex<Vec<QueryState>>,
    evidence: Mutex<Option<(EvidenceStrategy, bool)>>,
}

impl QueryTrace {
    fn new() -> Self {
        Self {
            states: Mutex::new(vec![QueryState::Idle]),
            evidence: Mutex::new(None),
        }
    }

    fn enter(&self, state: QueryState) {
        tracing::debug!("Query entering {}", state);
        self.states.lock().push(state);
    }

    fn current(&self) -> QueryState {
        self.states.lock().last().copied().unwrap_or(QueryState::Idle)
    }

    /// Enter `state` unless it is already the current one
    fn ensure(&self, state: QueryState) {
        if self.current() != state {
            self.enter(state);
        }
    }

    fn record_evidence(&self, evidence: &Evidence) {
        *self.evidence.lock() = Some((evidence.strategy, evidence.fell_back));
    }

    fn into_parts(self) -> (Vec<QueryState>, Option<(EvidenceStrategy, bool)>) {
        (self.states.into_inner(), self.evidence.into_inner())
    }
}

/// Result of one query run. Always produced, success or failure.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// JSON payload for the caller
    pub response: QueryResponse,
    /// Every state entered, ending in `Done` or `Failed`
    pub trace: Vec<QueryState>,
    /// Strategy that produced the evidence, when selection completed
    pub evidence: Option<EvidenceStrategy>,
    /// Retrieval failed and truncation was used instead
    pub fell_back: bool,
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        self.response.success
    }

    /// State the query was in when it failed
    pub fn failed_during(&self) -> Option<QueryState> {
        match self.trace.as_slice() {
            [.., previous, QueryState::Failed] => Some(*previous),
            _ => None,
        }
    }
}

/// Capabilities injected into the pipeline
///
/// Without an embedder the pipeline runs in truncation mode. Without a
/// completion service every query fails with a configuration error.
#[derive(Clone)]
pub struct Capabilities {
    pub fetcher: Arc<dyn DocumentFetcher>,
    pub decoder: Arc<dyn DocumentDecoder>,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub completion: Option<Arc<dyn CompletionProvider>>,
}

impl Capabilities {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, decoder: Arc<dyn DocumentDecoder>) -> Self {
        Self {
            fetcher,
            decoder,
            embedder: None,
            completion: None,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_completion(mut self, completion: Arc<dyn CompletionProvider>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Production capabilities for the configured backend
    ///
    /// The OpenAI backend needs its API key; a missing key is a configuration error.
    pub fn from_config(config: &ZoneRagConfig) -> Result<Self> {
        let fetcher: Arc<dyn DocumentFetcher> = Arc::new(HttpFetcher::new(&config.fetch)?);
        let decoder: Arc<dyn DocumentDecoder> = Arc::from(decoder_for(&config.decoder));
        let caps = Self::new(fetcher, decoder);

        let caps = match config.backend {
            BackendProvider::OpenAi => {
                let client = Arc::new(OpenAiClient::from_env(&config.openai, &config.llm)?);
                let caps = caps.with_completion(client.clone());
                if config.llm.enable_embeddings {
                    caps.with_embedder(client)
                } else {
                    caps
                }
            }
            BackendProvider::Ollama => {
                let client = Arc::new(OllamaClient::new(&config.ollama, &config.llm)?);
                let caps = caps.with_completion(client.clone());
                if config.llm.enable_embeddings {
                    caps.with_embedder(client)
                } else {
                    caps
                }
            }
        };

        tracing::debug!(
            "Capabilities: decoder={}, embeddings={}, backend={:?}",
            caps.decoder.name(),
            caps.embedder.is_some(),
            config.backend
        );
        Ok(caps)
    }
}

/// Answers questions about planning zones
pub struct QueryPipeline {
    registry: ZoneRegistry,
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: TextExtractor,
    selector: EvidenceSelector,
    synthesizer: Option<AnswerSynthesizer>,
    fetch_timeout: Duration,
}

impl QueryPipeline {
    /// Build a pipeline from validated settings and injected capabilities
    pub fn new(config: &ZoneRagConfig, caps: Capabilities) -> Result<Self> {
        config.validate()?;

        let chunker = TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let selector = EvidenceSelector::new(
            chunker,
            Arc::new(IndexCache::new()),
            caps.embedder,
            &config.retrieval,
        );

        tracing::info!(
            "Query pipeline ready: {} evidence, fetcher={}",
            selector.strategy(),
            caps.fetcher.name()
        );

        Ok(Self {
            registry: ZoneRegistry::with_overrides(&config.zones),
            fetcher: caps.fetcher,
            extractor: TextExtractor::new(caps.decoder),
            selector,
            synthesizer: caps.completion.map(AnswerSynthesizer::new),
            fetch_timeout: config.fetch.timeout(),
        })
    }

    /// Pipeline with production capabilities
    pub fn from_config(config: &ZoneRagConfig) -> Result<Self> {
        Self::new(config, Capabilities::from_config(config)?)
    }

    /// Replace the zone registry
    pub fn with_registry(mut self, registry: ZoneRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn strategy(&self) -> EvidenceStrategy {
        self.selector.strategy()
    }

    pub fn index_cache(&self) -> &Arc<IndexCache> {
        self.selector.cache()
    }

    /// Answer `question` about `zone_code`
    ///
    /// Never fails: errors, panics included, become a failure response.
    #[tracing::instrument(skip(self), fields(strategy = %self.selector.strategy()))]
    pub async fn run(&self, zone_code: &str, question: &str) -> QueryOutcome {
        let trace = QueryTrace::new();

        let result = AssertUnwindSafe(self.execute(zone_code, question, &trace))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(Error::internal(panic_message(payload))));

        let response = match result {
            Ok(answer) => {
                trace.enter(QueryState::Done);
                tracing::info!("Answered query for zone {}", zone_code);
                QueryResponse::from_answer(answer)
            }
            Err(e) => {
                let stage = trace.current();
                trace.enter(QueryState::Failed);
                tracing::error!("Query for zone {} failed while {}: {}", zone_code, stage, e);
                QueryResponse::failure(zone_code, question, &e)
            }
        };

        let (states, evidence) = trace.into_parts();
        QueryOutcome {
            response,
            trace: states,
            evidence: evidence.map(|(strategy, _)| strategy),
            fell_back: evidence.is_some_and(|(_, fell_back)| fell_back),
        }
    }

    pub async fn ask(&self, query: &Query) -> QueryOutcome {
        self.run(query.zone.as_str(), &query.question).await
    }

    /// Ask for a zone's height, coverage and setback rules
    pub async fn building_rules(&self, zone_code: &str) -> QueryOutcome {
        self.ask(&Query::building_rules(zone_code)).await
    }

    /// Ask which consents `building_type` needs in a zone
    pub async fn consent_requirements(&self, zone_code: &str, building_type: &str) -> QueryOutcome {
        self.ask(&Query::consent_requirements(zone_code, building_type))
            .await
    }

    async fn execute(&self, zone_code: &str, question: &str, trace: &QueryTrace) -> Result<Answer> {
        trace.enter(QueryState::ResolvingZone);
        let zone = ZoneCode::new(zone_code);
        let doc = self.registry.resolve(&zone)?;

        let synthesizer = self
            .synthesizer
            .as_ref()
            .ok_or_else(|| Error::config("no completion service configured"))?;

        let evidence = match self.selector.strategy() {
            EvidenceStrategy::Truncation => {
                let text = self.load_text(&doc, trace).await?;
                trace.enter(QueryState::SelectingEvidence);
                self.selector.truncate(&text)
            }
            EvidenceStrategy::Retrieval => {
                let doc = &doc;
                let evidence = self
                    .selector
                    .retrieve(&zone, question, move || async move {
                        let text = self.load_text(doc, trace).await?;
                        trace.enter(QueryState::SelectingEvidence);
                        Ok(text)
                    })
                    .await;
                // Fetch and decode failures stay attributed to the stage that raised them
                match &evidence {
                    Ok(_) => trace.ensure(QueryState::SelectingEvidence),
                    Err(e) if e.is_index_error() => trace.ensure(QueryState::SelectingEvidence),
                    Err(_) => {}
                }
                evidence?
            }
        };
        trace.record_evidence(&evidence);

        trace.enter(QueryState::Synthesizing);
        synthesizer.synthesize(&zone, question, &evidence).await
    }

    /// Fetch and extract a zone document
    async fn load_text(&self, doc: &DocumentRef, trace: &QueryTrace) -> Result<ExtractedText> {
        trace.enter(QueryState::Fetching);
        let raw = self.fetcher.fetch(doc, self.fetch_timeout).await?;

        trace.enter(QueryState::Extracting);
        self.extractor.extract(raw).await
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("query panicked: {}", detail)
}
