//! Aggregation output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SourceKind, Tier};

/// Why a source did or did not contribute to the final score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Reading took part in the weighted combination
    Included,
    /// Reading arrived with zero data points
    NoEvidence,
    /// No reading arrived (source unavailable or not fetched)
    Missing,
    /// Adapter refused the payload
    Rejected { reason: String },
}

/// One enabled source's line in the breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBreakdown {
    pub kind: SourceKind,
    pub normalized_score: u16,
    /// weight_bps x computed_reliability, 0 when not included
    pub effective_weight: f64,
    pub included: bool,
    pub weight_bps: u32,
    pub computed_reliability: f64,
    pub data_point_count: u64,
    #[serde(flatten)]
    pub status: SourceStatus,
}

impl SourceBreakdown {
    /// Entry for a source that produced nothing usable
    pub fn excluded(kind: SourceKind, weight_bps: u32, status: SourceStatus) -> Self {
        Self {
            kind,
            normalized_score: 0,
            effective_weight: 0.0,
            included: false,
            weight_bps,
            computed_reliability: 0.0,
            data_point_count: 0,
            status,
        }
    }
}

/// Final reputation for one agent and one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationResult {
    pub final_score: u16,
    pub tier: Tier,
    /// One entry per enabled source, in source declaration order
    pub per_source: Vec<SourceBreakdown>,
    pub overall_confidence: f64,
    pub computed_at: DateTime<Utc>,
}

impl ReputationResult {
    /// Result for an agent with no usable evidence
    pub fn unproven(per_source: Vec<SourceBreakdown>, computed_at: DateTime<Utc>) -> Self {
        Self {
            final_score: 0,
            tier: Tier::Unproven,
            per_source,
            overall_confidence: 0.0,
            computed_at,
        }
    }

    /// Breakdown entry for a kind, if it is enabled
    pub fn source(&self, kind: SourceKind) -> Option<&SourceBreakdown> {
        self.per_source.iter().find(|entry| entry.kind == kind)
    }

    /// Number of sources that contributed
    pub fn included_count(&self) -> usize {
        self.per_source.iter().filter(|entry| entry.included).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_serializes_status_inline() {
        let entry = SourceBreakdown::excluded(
            SourceKind::OperatorWebhook,
            1500,
            SourceStatus::Rejected {
                reason: "bad scale".to_string(),
            },
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "rejected");
        assert_eq!(value["reason"], "bad scale");
        assert_eq!(value["kind"], "operator_webhook");
        assert_eq!(value["included"], false);
    }

    #[test]
    fn test_unproven_lookup() {
        let result = ReputationResult::unproven(
            vec![SourceBreakdown::excluded(
                SourceKind::AttestationFeed,
                2000,
                SourceStatus::Missing,
            )],
            Utc::now(),
        );
        assert_eq!(result.tier, Tier::Unproven);
        assert_eq!(result.included_count(), 0);
        assert!(result.source(SourceKind::AttestationFeed).is_some());
        assert!(result.source(SourceKind::CodeHostingActivity).is_none());
    }
}
