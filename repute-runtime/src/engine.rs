//! Reputation Engine
//!
//! Orchestrates one scoring run per agent:
//! - Serve a cached report unless a refresh is requested
//! - Fetch every enabled source concurrently, each bounded by a timeout
//! - Interpret payloads with the registered adapters
//! - Record adapter failures as rejected sources instead of aborting
//! - Aggregate, cache and return the report

use chrono::Utc;
use futures::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use repute_core::{
    Aggregator, RawPayload, ReputationResult, SourceConfig, SourceKind, SourceReading,
    SourceStatus,
};
use repute_sources::{RegistryError, SourceRegistry};

use crate::cache::{MemoryScoreCache, ScoreCache};
use crate::fetch::PayloadFetcher;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Longest a single source fetch may take
    pub fetch_timeout: Duration,
    /// How long reports stay cached
    pub cache_ttl: chrono::Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            cache_ttl: chrono::Duration::seconds(crate::cache::DEFAULT_CACHE_TTL_SECS),
        }
    }
}

/// A source whose payload the adapter refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: SourceKind,
    pub reason: String,
}

/// Result of one scoring run plus run metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub run_id: Uuid,
    pub agent_id: String,
    pub result: ReputationResult,
    pub rejections: Vec<Rejection>,
    /// Served from the cache rather than computed
    #[serde(default)]
    pub from_cache: bool,
}

/// The scoring engine
pub struct ReputationEngine {
    registry: RwLock<SourceRegistry>,
    aggregator: Aggregator,
    fetchers: HashMap<SourceKind, Arc<dyn PayloadFetcher>>,
    cache: Arc<dyn ScoreCache>,
    fetch_timeout: Duration,
    /// Bumped on every configuration change, under the registry write lock
    generation: AtomicU64,
}

impl ReputationEngine {
    /// Create an engine with an in-memory cache and no fetchers
    pub fn new(registry: SourceRegistry, config: EngineConfig) -> Self {
        Self {
            registry: RwLock::new(registry),
            aggregator: Aggregator::new(),
            fetchers: HashMap::new(),
            cache: Arc::new(MemoryScoreCache::new(config.cache_ttl)),
            fetch_timeout: config.fetch_timeout,
            generation: AtomicU64::new(0),
        }
    }

    /// Attach the fetcher for its source kind, replacing any previous one
    pub fn with_fetcher(mut self, fetcher: Arc<dyn PayloadFetcher>) -> Self {
        self.fetchers.insert(fetcher.kind(), fetcher);
        self
    }

    /// Use a different cache
    pub fn with_cache(mut self, cache: Arc<dyn ScoreCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Score already-fetched payloads.
    ///
    /// Enabled sources without a payload are reported as missing. Payloads
    /// for disabled sources are ignored.
    pub fn score_payloads(
        &self,
        agent_id: &str,
        payloads: &HashMap<SourceKind, RawPayload>,
    ) -> ScoreReport {
        let run_id = Uuid::new_v4();
        let mut readings: Vec<SourceReading> = Vec::new();
        let mut rejections = Vec::new();

        let configs: Vec<SourceConfig> = {
            let registry = self.registry.read();
            let enabled = registry.enabled_sources();

            for (kind, config, adapter) in &enabled {
                let Some(payload) = payloads.get(kind) else {
                    debug!("[{}] no {} payload for {}", run_id, kind, agent_id);
                    continue;
                };
                match adapter.interpret(agent_id, payload, config) {
                    Ok(reading) => {
                        debug!(
                            "[{}] {} -> score {}, {} data points, reliability {:.3}",
                            run_id,
                            kind,
                            reading.normalized_score,
                            reading.data_point_count,
                            reading.computed_reliability
                        );
                        readings.push(reading);
                    }
                    Err(e) => {
                        warn!("[{}] {} rejected for {}: {}", run_id, kind, agent_id, e);
                        rejections.push(Rejection {
                            kind: *kind,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            enabled.into_iter().map(|(_, config, _)| config.clone()).collect()
        };

        let mut result = self.aggregator.aggregate(&configs, &readings, Utc::now());
        for rejection in &rejections {
            if let Some(entry) = result.per_source.iter_mut().find(|e| e.kind == rejection.kind) {
                entry.status = SourceStatus::Rejected {
                    reason: rejection.reason.clone(),
                };
            }
        }

        info!(
            "[{}] {} scored {} ({}), confidence {:.2}, {}/{} sources used",
            run_id,
            agent_id,
            result.final_score,
            result.tier,
            result.overall_confidence,
            result.included_count(),
            result.per_source.len()
        );

        ScoreReport {
            run_id,
            agent_id: agent_id.to_string(),
            result,
            rejections,
            from_cache: false,
        }
    }

    /// Score an agent, fetching every enabled source concurrently.
    ///
    /// Returns the cached report when one is fresh and `refresh` is false.
    pub async fn score(&self, agent_id: &str, refresh: bool) -> ScoreReport {
        if !refresh {
            if let Some(mut cached) = self.cache.get(agent_id) {
                debug!("Serving cached score for {}", agent_id);
                cached.from_cache = true;
                return cached;
            }
        }

        let generation = self.config_generation();
        let payloads = self.fetch_all(agent_id).await;
        let report = self.score_payloads(agent_id, &payloads);
        if !self.cache_if_current(report.clone(), generation) {
            debug!(
                "[{}] configuration changed during run, not caching {}",
                report.run_id, agent_id
            );
        }
        report
    }

    /// Current configuration generation
    pub fn config_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Cache a report unless the configuration changed since `generation`
    fn cache_if_current(&self, report: ScoreReport, generation: u64) -> bool {
        let _registry = self.registry.read();
        if self.config_generation() != generation {
            return false;
        }
        self.cache.put(report);
        true
    }

    async fn fetch_all(&self, agent_id: &str) -> HashMap<SourceKind, RawPayload> {
        let kinds: Vec<SourceKind> = self
            .registry
            .read()
            .enabled_sources()
            .into_iter()
            .map(|(kind, _, _)| kind)
            .collect();

        let fetches = kinds.into_iter().filter_map(|kind| {
            let Some(fetcher) = self.fetchers.get(&kind).cloned() else {
                debug!("No fetcher for {}", kind);
                return None;
            };
            let limit = self.fetch_timeout;
            Some(async move { (kind, timeout(limit, fetcher.fetch(agent_id)).await) })
        });

        let mut payloads = HashMap::new();
        for (kind, outcome) in join_all(fetches).await {
            match outcome {
                Ok(Ok(payload)) => {
                    payloads.insert(kind, payload);
                }
                Ok(Err(e)) => warn!("Fetching {} for {} failed: {}", kind, agent_id, e),
                Err(_) => warn!(
                    "Fetching {} for {} timed out after {:?}",
                    kind, agent_id, self.fetch_timeout
                ),
            }
        }
        payloads
    }

    /// Replace configuration for one kind between runs
    pub fn configure(&self, kind: SourceKind, config: SourceConfig) -> Result<(), RegistryError> {
        let mut registry = self.registry.write();
        registry.configure(kind, config)?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.clear();
        Ok(())
    }

    /// Hot-reload a set of configurations; cached reports are dropped
    pub fn reload(&self, configs: Vec<SourceConfig>) -> Result<(), RegistryError> {
        let mut registry = self.registry.write();
        registry.apply(configs)?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.clear();
        drop(registry);
        info!("Source configuration reloaded");
        Ok(())
    }

    /// Snapshot of enabled configurations
    pub fn enabled_configs(&self) -> Vec<SourceConfig> {
        self.registry.read().enabled_configs()
    }

    /// Drop the cached report for an agent
    pub fn invalidate(&self, agent_id: &str) -> bool {
        self.cache.invalidate(agent_id)
    }
}
