//! Attestation feed adapter
//!
//! A third-party attestation service publishes a score on a scale it declares
//! itself. The adapter only checks and rescales it: an insane scale is an
//! invalid payload, a score outside the declared scale is rejected rather than
//! clamped so a misbehaving integration shows up in the breakdown.
//!
//! Attestations cannot be verified independently, so reliability never exceeds
//! [`ATTESTATION_RELIABILITY_CEILING`] however many attestations back the score.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use repute_core::{ConfigError, RawPayload, SourceConfig, SourceKind, SourceReading};

use crate::scoring::{
    ensure_not_future, max_scale_span, recency_factor, validate_scale_span, volume_factor,
    DeclaredScale,
};
use crate::traits::{parse_payload, reading_for, require_non_empty, SourceAdapter, SourceError};

/// Hard reliability ceiling for attestation scores
pub const ATTESTATION_RELIABILITY_CEILING: f64 = 0.6;

/// Attestations needed for full volume credit
const ATTESTATION_SATURATION: u64 = 10;

#[derive(Debug, Deserialize)]
struct Attestation {
    provider: String,
    score: f64,
    scale_min: f64,
    scale_max: f64,
    attestation_count: u64,
    issued_at: DateTime<Utc>,
}

/// Adapter for third-party attestation scores
#[derive(Debug, Clone, Copy, Default)]
pub struct AttestationAdapter;

impl AttestationAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SourceAdapter for AttestationAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::AttestationFeed
    }

    fn interpret(
        &self,
        agent_id: &str,
        payload: &RawPayload,
        config: &SourceConfig,
    ) -> Result<SourceReading, SourceError> {
        let attestation: Attestation = parse_payload(self.kind(), payload)?;
        require_non_empty("provider", &attestation.provider)?;
        ensure_not_future("issued_at", attestation.issued_at, payload.fetched_at)?;

        let scale = DeclaredScale::new(
            attestation.scale_min,
            attestation.scale_max,
            max_scale_span(config),
        )?;
        let normalized = scale.normalize(attestation.score)?;

        let age = payload.fetched_at - attestation.issued_at;
        let reliability = (volume_factor(attestation.attestation_count, ATTESTATION_SATURATION)
            * recency_factor(age))
        .min(ATTESTATION_RELIABILITY_CEILING)
        .min(config.reliability_ceiling());

        debug!(
            "Attestation from {} for {}: {} on [{}, {}], reliability {:.3}",
            attestation.provider, agent_id, attestation.score, scale.min, scale.max, reliability
        );

        Ok(reading_for(self.kind(), agent_id, payload)
            .score(normalized)
            .data_points(attestation.attestation_count)
            .reliability(reliability)
            .build())
    }

    fn validate_options(&self, config: &SourceConfig) -> Result<(), ConfigError> {
        validate_scale_span(config)
    }
}
