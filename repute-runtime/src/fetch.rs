//! Payload fetchers
//!
//! Talking to each source (HTTP, RPC, code-hosting APIs) happens behind this
//! trait. The engine only sees the fetched payload or an unavailable source.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use repute_core::{RawPayload, SourceKind};

/// Errors from fetching a source payload
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Supplies raw payloads for one source kind
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    /// Source kind this fetcher serves
    fn kind(&self) -> SourceKind;

    /// Fetch the raw payload for an agent
    async fn fetch(&self, agent_id: &str) -> Result<RawPayload, FetchError>;
}

/// Fetcher serving payloads that were loaded ahead of time
pub struct StaticFetcher {
    kind: SourceKind,
    payloads: DashMap<String, RawPayload>,
}

impl StaticFetcher {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            payloads: DashMap::new(),
        }
    }

    /// Add or replace the payload served for an agent
    pub fn insert(&self, agent_id: &str, payload: RawPayload) {
        self.payloads.insert(agent_id.to_string(), payload);
    }

    pub fn with_payload(self, agent_id: &str, payload: RawPayload) -> Self {
        self.insert(agent_id, payload);
        self
    }

    /// Count of agents with a payload
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

#[async_trait]
impl PayloadFetcher for StaticFetcher {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, agent_id: &str) -> Result<RawPayload, FetchError> {
        self.payloads
            .get(agent_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                FetchError::Unavailable(format!("no {} payload for {}", self.kind, agent_id))
            })
    }
}
