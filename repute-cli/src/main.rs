//! Repute CLI
//!
//! Scores an agent from payload files produced by the fetch layer.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use repute_core::{RawPayload, SourceConfig, SourceKind, TIER_THRESHOLDS};
use repute_runtime::{EngineConfig, ReputationEngine, StaticFetcher};
use repute_sources::{default_sources, load_sources, SourceRegistry, SourcesFile};

#[derive(Parser)]
#[command(name = "repute")]
#[command(author, version, about = "Repute: multi-source agent reputation scoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Score an agent from fetched source payloads
    Score {
        /// Agent identity to score
        #[arg(short, long)]
        agent: String,

        /// JSON file mapping source kinds to fetched payloads
        #[arg(short, long)]
        payloads: PathBuf,

        /// Sources TOML file (defaults to the built-in table)
        #[arg(short, long, env = "REPUTE_SOURCES")]
        config: Option<PathBuf>,

        /// Per-source fetch timeout in milliseconds
        #[arg(long, default_value = "10000")]
        timeout_ms: u64,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Show the effective source configuration
    Sources {
        /// Sources TOML file (defaults to the built-in table)
        #[arg(short, long, env = "REPUTE_SOURCES")]
        config: Option<PathBuf>,
    },

    /// Show tier thresholds
    Tiers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; stdout carries the report
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Score {
            agent,
            payloads,
            config,
            timeout_ms,
            pretty,
        } => {
            run_score(&agent, &payloads, config.as_deref(), timeout_ms, pretty).await?;
        }
        Commands::Sources { config } => {
            print!("{}", render_sources(config.as_deref())?);
        }
        Commands::Tiers => {
            for (i, (tier, lower)) in TIER_THRESHOLDS.iter().enumerate() {
                let upper = TIER_THRESHOLDS
                    .get(i + 1)
                    .map(|(_, next)| format!("{})", next))
                    .unwrap_or_else(|| "1000]".to_string());
                println!("{:<12} [{}, {}", tier, lower, upper);
            }
        }
    }

    Ok(())
}

async fn run_score(
    agent: &str,
    payloads_path: &Path,
    config: Option<&Path>,
    timeout_ms: u64,
    pretty: bool,
) -> Result<()> {
    let configs = resolve_configs(config)?;
    let registry = SourceRegistry::from_configs(configs)?;

    let text = fs::read_to_string(payloads_path)
        .with_context(|| format!("Failed to read {}", payloads_path.display()))?;
    let payloads = parse_payload_file(&text, Utc::now())?;
    info!("Loaded {} source payloads for {}", payloads.len(), agent);

    let engine_config = EngineConfig {
        fetch_timeout: Duration::from_millis(timeout_ms),
        ..Default::default()
    };
    let mut engine = ReputationEngine::new(registry, engine_config);
    for (kind, payload) in payloads {
        engine = engine.with_fetcher(Arc::new(StaticFetcher::new(kind).with_payload(agent, payload)));
    }

    let report = engine.score(agent, true).await;
    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);

    Ok(())
}

/// Effective configuration of every registered kind as TOML
fn render_sources(path: Option<&Path>) -> Result<String> {
    let registry = SourceRegistry::from_configs(resolve_configs(path)?)?;
    Ok(toml::to_string(&SourcesFile::from_configs(registry.configs()))?)
}

fn resolve_configs(path: Option<&Path>) -> Result<Vec<SourceConfig>> {
    match path {
        Some(path) => Ok(load_sources(path)?),
        None => Ok(default_sources()),
    }
}

/// Parse a payload file.
///
/// Each key is a source kind name. A value with a `body` field is a full
/// payload (`fetched_at` optional); anything else is a bare body.
fn parse_payload_file(text: &str, now: DateTime<Utc>) -> Result<HashMap<SourceKind, RawPayload>> {
    let root: Value = serde_json::from_str(text).context("Payload file is not valid JSON")?;
    let Value::Object(entries) = root else {
        anyhow::bail!("Payload file must be a JSON object keyed by source kind");
    };

    let mut payloads = HashMap::new();
    for (name, value) in entries {
        let kind: SourceKind = name.parse()?;
        let payload = match value {
            Value::Object(mut fields) if fields.contains_key("body") => {
                let body = fields.remove("body").unwrap_or(Value::Null);
                let fetched_at = match fields.remove("fetched_at") {
                    Some(at) => serde_json::from_value(at)
                        .with_context(|| format!("Invalid fetched_at for {}", kind))?,
                    None => now,
                };
                RawPayload::new(body, fetched_at)
            }
            body => RawPayload::new(body, now),
        };
        payloads.insert(kind, payload);
    }
    Ok(payloads)
}
