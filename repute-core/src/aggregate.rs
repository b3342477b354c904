//! Aggregator - fuses source readings into one reputation result
//!
//! The combination is a reliability-weighted mean:
//! - effective weight = configured weight (bps) x reading reliability
//! - final score = round(sum(w * score) / sum(w)) over readings with evidence
//! - confidence = sum(w) / sum(configured weight of enabled sources)
//!
//! Every input resolves to a result. No evidence at all yields an `Unproven`
//! result with zero confidence.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::{
    clamp_reliability, clamp_score, ReputationResult, SourceBreakdown, SourceConfig,
    SourceReading, SourceStatus, Tier, SCORE_MAX,
};

/// Stateless score aggregator
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Combine readings under the given configurations.
    ///
    /// Disabled configurations are skipped. Readings for kinds without an
    /// enabled configuration are ignored. The breakdown follows source
    /// declaration order regardless of input order.
    pub fn aggregate(
        &self,
        configs: &[SourceConfig],
        readings: &[SourceReading],
        computed_at: DateTime<Utc>,
    ) -> ReputationResult {
        let mut enabled: Vec<&SourceConfig> = configs.iter().filter(|c| c.enabled).collect();
        enabled.sort_by_key(|c| c.kind);
        enabled.dedup_by_key(|c| c.kind);

        let configured_weight: f64 = enabled.iter().map(|c| c.weight_bps as f64).sum();

        let mut per_source = Vec::with_capacity(enabled.len());
        let mut total_weight = 0.0;
        let mut weighted_sum = 0.0;

        for config in enabled {
            let Some(reading) = select_reading(readings, config) else {
                per_source.push(SourceBreakdown::excluded(
                    config.kind,
                    config.weight_bps,
                    SourceStatus::Missing,
                ));
                continue;
            };

            // Readings can be built without the builder; clamp again here.
            let score = reading.normalized_score.min(SCORE_MAX);
            let reliability = clamp_reliability(reading.computed_reliability);

            if !reading.has_evidence() {
                per_source.push(SourceBreakdown {
                    normalized_score: score,
                    computed_reliability: reliability,
                    ..SourceBreakdown::excluded(
                        config.kind,
                        config.weight_bps,
                        SourceStatus::NoEvidence,
                    )
                });
                continue;
            }

            let effective_weight = config.weight_bps as f64 * reliability;
            total_weight += effective_weight;
            weighted_sum += effective_weight * score as f64;

            per_source.push(SourceBreakdown {
                kind: config.kind,
                normalized_score: score,
                effective_weight,
                included: true,
                weight_bps: config.weight_bps,
                computed_reliability: reliability,
                data_point_count: reading.data_point_count,
                status: SourceStatus::Included,
            });
        }

        if total_weight <= 0.0 {
            return ReputationResult::unproven(per_source, computed_at);
        }

        let final_score = clamp_score(weighted_sum / total_weight);
        let overall_confidence = if configured_weight > 0.0 {
            (total_weight / configured_weight).clamp(0.0, 1.0)
        } else {
            0.0
        };

        ReputationResult {
            final_score,
            tier: Tier::from_score(final_score),
            per_source,
            overall_confidence,
            computed_at,
        }
    }
}

/// Pick the reading for a configured kind.
///
/// Duplicates resolve to the most recently fetched reading, then the one with
/// more data points, then the lower score, so input order never matters.
fn select_reading<'a>(
    readings: &'a [SourceReading],
    config: &SourceConfig,
) -> Option<&'a SourceReading> {
    readings
        .iter()
        .filter(|r| r.kind == config.kind)
        .max_by(|a, b| {
            a.fetched_at
                .cmp(&b.fetched_at)
                .then(a.data_point_count.cmp(&b.data_point_count))
                .then(b.normalized_score.cmp(&a.normalized_score))
                .then_with(|| {
                    b.computed_reliability
                        .partial_cmp(&a.computed_reliability)
                        .unwrap_or(Ordering::Equal)
                })
        })
}
