//! Normalized readings produced by source adapters
//!
//! A reading is one source's contribution to a score:
//! - Score on the canonical 0..=1000 scale
//! - Evidence volume (data points)
//! - Run-time reliability in [0, 1]
//! - A digest of the raw payload for audit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{SourceKind, MAX_RELIABILITY, MIN_RELIABILITY, SCORE_MAX};

/// A raw payload as handed over by the fetch layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPayload {
    /// Source-specific structured body
    pub body: Value,
    /// When the fetch layer obtained the body
    pub fetched_at: DateTime<Utc>,
}

impl RawPayload {
    pub fn new(body: Value, fetched_at: DateTime<Utc>) -> Self {
        Self { body, fetched_at }
    }

    /// Payload stamped with the current time
    pub fn now(body: Value) -> Self {
        Self::new(body, Utc::now())
    }

    /// Hex SHA-256 over the agent id and the serialized body
    pub fn digest(&self, agent_id: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(agent_id.as_bytes());
        hasher.update([0u8]);
        let body = serde_json::to_string(&self.body).unwrap_or_default();
        hasher.update(body.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// One adapter's output for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReading {
    pub kind: SourceKind,
    /// Score on the canonical scale (0 - 1000)
    pub normalized_score: u16,
    /// Number of evidence items behind the score
    pub data_point_count: u64,
    /// How much this reading should be trusted this run (0.0 - 1.0)
    pub computed_reliability: f64,
    /// Audit digest of the raw payload, never used in scoring
    pub raw_payload_digest: String,
    pub fetched_at: DateTime<Utc>,
}

impl SourceReading {
    /// Create a new reading builder
    pub fn builder(kind: SourceKind) -> ReadingBuilder {
        ReadingBuilder::new(kind)
    }

    /// Whether the reading carries any evidence
    pub fn has_evidence(&self) -> bool {
        self.data_point_count > 0
    }
}

/// Builder for readings; every setter clamps into the valid range
pub struct ReadingBuilder {
    kind: SourceKind,
    normalized_score: u16,
    data_point_count: u64,
    computed_reliability: f64,
    raw_payload_digest: String,
    fetched_at: DateTime<Utc>,
}

impl ReadingBuilder {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            normalized_score: 0,
            data_point_count: 0,
            computed_reliability: MIN_RELIABILITY,
            raw_payload_digest: String::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Score on the canonical scale; non-finite values become 0
    pub fn score(mut self, score: f64) -> Self {
        self.normalized_score = clamp_score(score);
        self
    }

    pub fn data_points(mut self, count: u64) -> Self {
        self.data_point_count = count;
        self
    }

    pub fn reliability(mut self, reliability: f64) -> Self {
        self.computed_reliability = clamp_reliability(reliability);
        self
    }

    pub fn digest(mut self, digest: impl Into<String>) -> Self {
        self.raw_payload_digest = digest.into();
        self
    }

    pub fn fetched_at(mut self, at: DateTime<Utc>) -> Self {
        self.fetched_at = at;
        self
    }

    /// Take digest and fetch time from a raw payload
    pub fn payload(self, agent_id: &str, payload: &RawPayload) -> Self {
        let digest = payload.digest(agent_id);
        self.digest(digest).fetched_at(payload.fetched_at)
    }

    pub fn build(self) -> SourceReading {
        SourceReading {
            kind: self.kind,
            normalized_score: self.normalized_score.min(SCORE_MAX),
            data_point_count: self.data_point_count,
            computed_reliability: self.computed_reliability,
            raw_payload_digest: self.raw_payload_digest,
            fetched_at: self.fetched_at,
        }
    }
}

/// Round and clamp a score onto 0..=1000
pub fn clamp_score(score: f64) -> u16 {
    if !score.is_finite() {
        return 0;
    }
    score.round().clamp(0.0, SCORE_MAX as f64) as u16
}

/// Clamp a reliability into [0, 1]; non-finite values become 0
pub fn clamp_reliability(reliability: f64) -> f64 {
    if !reliability.is_finite() {
        return MIN_RELIABILITY;
    }
    reliability.clamp(MIN_RELIABILITY, MAX_RELIABILITY)
}
