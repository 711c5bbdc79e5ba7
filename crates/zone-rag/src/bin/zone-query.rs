//! Zone planning query CLI
//!
//! Run with: cargo run -p zone-rag --bin zone-query -- H3 What is the maximum building height?
//!
//! Prints a single JSON object on stdout. Logs go to stderr.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zone_rag::config::StrategyPreference;
use zone_rag::types::query::DEFAULT_BUILDING_TYPE;
use zone_rag::{Error, Query, QueryPipeline, QueryResponse, ZoneRagConfig, ZoneRegistry};

const EXIT_QUERY_FAILED: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "zone-query",
    version,
    about = "Answer planning-rule questions from a zone's regulation document"
)]
struct Cli {
    /// Zone code, e.g. H3 or D18
    #[arg(required_unless_present = "list_zones")]
    zone: Option<String>,

    /// Question about the zone (words are joined with spaces)
    #[arg(
        trailing_var_arg = true,
        required_unless_present_any = ["preset", "list_zones"]
    )]
    question: Vec<String>,

    /// Config file (default: <config dir>/zone-rag/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evidence strategy: auto, retrieval or truncation
    #[arg(long, value_parser = parse_strategy)]
    strategy: Option<StrategyPreference>,

    /// Chunks retrieved per question
    #[arg(long)]
    top_k: Option<usize>,

    /// Character budget for truncated evidence
    #[arg(long)]
    max_chars: Option<usize>,

    /// Ask a canned question instead of QUESTION
    #[arg(long, value_enum, conflicts_with = "question")]
    preset: Option<Preset>,

    /// Building type for the consent preset
    #[arg(long, default_value = DEFAULT_BUILDING_TYPE)]
    building_type: String,

    /// Single-line JSON output
    #[arg(long)]
    compact: bool,

    /// Print the zone registry and exit
    #[arg(long)]
    list_zones: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    BuildingRules,
    Consent,
}

fn parse_strategy(value: &str) -> Result<StrategyPreference, Error> {
    value.parse()
}

impl Cli {
    fn query(&self) -> Query {
        let zone = self.zone.clone().unwrap_or_default();
        match self.preset {
            Some(Preset::BuildingRules) => Query::building_rules(zone.as_str()),
            Some(Preset::Consent) => Query::consent_requirements(zone.as_str(), &self.building_type),
            None => Query::new(zone.as_str(), self.question.join(" ")),
        }
    }

    /// File and environment settings, then command-line overrides
    fn load_config(&self) -> zone_rag::Result<ZoneRagConfig> {
        let mut config = ZoneRagConfig::load(self.config.as_deref())?;
        if let Some(strategy) = self.strategy {
            config.retrieval.strategy = strategy;
        }
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(max_chars) = self.max_chars {
            config.retrieval.max_context_chars = max_chars;
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_response(response: &QueryResponse, compact: bool) -> anyhow::Result<()> {
    let json = response
        .to_json(compact)
        .context("failed to serialize response")?;
    println!("{}", json);
    Ok(())
}

fn print_zones(registry: &ZoneRegistry, compact: bool) -> anyhow::Result<()> {
    let zones: Vec<_> = registry.iter().collect();
    let json = if compact {
        serde_json::to_string(&zones)
    } else {
        serde_json::to_string_pretty(&zones)
    }
    .context("failed to serialize zone list")?;
    println!("{}", json);
    Ok(())
}

fn exit_code_for(error: &Error) -> u8 {
    match error {
        Error::Config(_) => EXIT_CONFIG_ERROR,
        _ => EXIT_QUERY_FAILED,
    }
}

/// Report a failure that happened before the pipeline could run
fn fail(query: &Query, error: &Error, compact: bool) -> ExitCode {
    tracing::error!("{}", error);
    let response = QueryResponse::failure(query.zone.as_str(), query.question.as_str(), error);
    if let Err(e) = print_response(&response, compact) {
        eprintln!("{:#}", e);
    }
    ExitCode::from(exit_code_for(error))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zone_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let query = cli.query();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => return fail(&query, &e, cli.compact),
    };

    if cli.list_zones {
        let registry = ZoneRegistry::with_overrides(&config.zones);
        return match print_zones(&registry, cli.compact) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{:#}", e);
                ExitCode::from(EXIT_QUERY_FAILED)
            }
        };
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.backend);
    tracing::info!("  - Strategy: {:?}", config.retrieval.strategy);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    let pipeline = match QueryPipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => return fail(&query, &e, cli.compact),
    };

    let outcome = pipeline.ask(&query).await;
    tracing::debug!("Query trace: {:?}", outcome.trace);

    if let Err(e) = print_response(&outcome.response, cli.compact) {
        eprintln!("{:#}", e);
        return ExitCode::from(EXIT_QUERY_FAILED);
    }

    if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_QUERY_FAILED)
    }
}
