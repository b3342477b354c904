//! Code-hosting activity adapter
//!
//! Scores an agent's public development footprint (as reported by a
//! code-hosting API client) out of 100 points:
//! - Commit volume: up to 30
//! - Stars across repositories: up to 25
//! - Account age: up to 20 (stepped)
//! - Followers: up to 15
//! - Public repositories: up to 10
//!
//! This evidence is not backed by payments, so reliability starts at 0.7 and
//! is discounted for young accounts, thin commit history and stale activity.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use repute_core::{RawPayload, SourceConfig, SourceKind, SourceReading};

use crate::scoring::{ensure_not_future, SaturatingCurve};
use crate::traits::{parse_payload, reading_for, SourceAdapter, SourceError};

static COMMIT_CURVE: SaturatingCurve =
    SaturatingCurve::new(&[(0.0, 0.0), (100.0, 10.0), (1_000.0, 20.0), (10_000.0, 30.0)]);

static STAR_CURVE: SaturatingCurve =
    SaturatingCurve::new(&[(0.0, 0.0), (10.0, 5.0), (100.0, 15.0), (1_000.0, 25.0)]);

static FOLLOWER_CURVE: SaturatingCurve =
    SaturatingCurve::new(&[(0.0, 0.0), (10.0, 5.0), (100.0, 10.0), (1_000.0, 15.0)]);

static REPO_CURVE: SaturatingCurve =
    SaturatingCurve::new(&[(0.0, 0.0), (5.0, 3.0), (20.0, 6.0), (50.0, 10.0)]);

/// Reliability of unverified external activity data
pub const CODE_HOSTING_BASE_RELIABILITY: f64 = 0.7;

const DAYS_PER_YEAR: i64 = 365;
const HALF_YEAR_DAYS: i64 = 182;

/// Account younger than six months
const NEW_ACCOUNT_DISCOUNT: f64 = 0.57;
/// Account younger than a year
const YOUNG_ACCOUNT_DISCOUNT: f64 = 0.71;
/// Fewer than `THIN_COMMIT_COUNT` commits
const THIN_EVIDENCE_DISCOUNT: f64 = 0.7;
const THIN_COMMIT_COUNT: u64 = 10;
/// No activity within a year of the fetch
const STALE_ACTIVITY_DISCOUNT: f64 = 0.8;

/// Fields required from a code-hosting profile payload
#[derive(Debug, Deserialize)]
struct CodeHostingProfile {
    created_at: DateTime<Utc>,
    total_commits: u64,
    total_stars: u64,
    followers: u64,
    public_repos: u64,
    #[serde(default)]
    last_active_at: Option<DateTime<Utc>>,
}

/// Adapter for code-hosting activity
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeHostingAdapter;

impl CodeHostingAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Stepped points for account age
    fn account_age_points(age_days: i64) -> f64 {
        match age_days {
            d if d < DAYS_PER_YEAR => 5.0,
            d if d < 3 * DAYS_PER_YEAR => 10.0,
            d if d < 5 * DAYS_PER_YEAR => 15.0,
            _ => 20.0,
        }
    }

    /// Raw score out of 100
    fn raw_score(profile: &CodeHostingProfile, age_days: i64) -> f64 {
        COMMIT_CURVE.eval(profile.total_commits as f64)
            + STAR_CURVE.eval(profile.total_stars as f64)
            + Self::account_age_points(age_days)
            + FOLLOWER_CURVE.eval(profile.followers as f64)
            + REPO_CURVE.eval(profile.public_repos as f64)
    }

    fn reliability(profile: &CodeHostingProfile, age_days: i64, fetched_at: DateTime<Utc>) -> f64 {
        let mut reliability = CODE_HOSTING_BASE_RELIABILITY;

        if age_days < HALF_YEAR_DAYS {
            reliability *= NEW_ACCOUNT_DISCOUNT;
        } else if age_days < DAYS_PER_YEAR {
            reliability *= YOUNG_ACCOUNT_DISCOUNT;
        }

        if profile.total_commits < THIN_COMMIT_COUNT {
            reliability *= THIN_EVIDENCE_DISCOUNT;
        }

        if let Some(last_active) = profile.last_active_at {
            if (fetched_at - last_active).num_days() > DAYS_PER_YEAR {
                reliability *= STALE_ACTIVITY_DISCOUNT;
            }
        }

        reliability
    }
}

impl SourceAdapter for CodeHostingAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::CodeHostingActivity
    }

    fn interpret(
        &self,
        agent_id: &str,
        payload: &RawPayload,
        config: &SourceConfig,
    ) -> Result<SourceReading, SourceError> {
        let profile: CodeHostingProfile = parse_payload(self.kind(), payload)?;
        ensure_not_future("created_at", profile.created_at, payload.fetched_at)?;
        if let Some(last_active) = profile.last_active_at {
            ensure_not_future("last_active_at", last_active, payload.fetched_at)?;
        }

        let age_days = (payload.fetched_at - profile.created_at).num_days().max(0);
        let raw = Self::raw_score(&profile, age_days);
        let reliability = Self::reliability(&profile, age_days, payload.fetched_at)
            .min(config.reliability_ceiling());
        let data_points = profile.total_commits.saturating_add(profile.public_repos);

        debug!(
            "Code hosting for {}: raw {:.1}/100, {} days old, reliability {:.3}",
            agent_id, raw, age_days, reliability
        );

        Ok(reading_for(self.kind(), agent_id, payload)
            .score(raw * 10.0)
            .data_points(data_points)
            .reliability(reliability)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn config() -> SourceConfig {
        SourceConfig::new(SourceKind::CodeHostingActivity, 2500)
    }

    fn payload(
        age: Duration,
        commits: u64,
        stars: u64,
        followers: u64,
        repos: u64,
    ) -> RawPayload {
        let fetched_at = Utc::now();
        RawPayload::new(
            json!({
                "login": "agent-smith",
                "created_at": (fetched_at - age).to_rfc3339(),
                "total_commits": commits,
                "total_stars": stars,
                "followers": followers,
                "public_repos": repos,
            }),
            fetched_at,
        )
    }

    #[test]
    fn test_established_profile() {
        let adapter = CodeHostingAdapter::new();
        let reading = adapter
            .interpret("agent-1", &payload(Duration::days(4 * 365), 1000, 100, 100, 20), &config())
            .unwrap();

        // 20 + 15 + 15 + 10 + 6 = 66 points
        assert_eq!(reading.normalized_score, 660);
        assert_eq!(reading.data_point_count, 1020);
        assert!((reading.computed_reliability - 0.7).abs() < 1e-9);
        assert_eq!(reading.kind, SourceKind::CodeHostingActivity);
        assert_eq!(reading.raw_payload_digest.len(), 64);
    }

    #[test]
    fn test_interpolates_between_breakpoints() {
        let adapter = CodeHostingAdapter::new();
        let reading = adapter
            .interpret("agent-1", &payload(Duration::days(2 * 365), 550, 55, 0, 0), &config())
            .unwrap();
        // commits 15 + stars 10 + age 10
        assert_eq!(reading.normalized_score, 350);
    }

    #[test]
    fn test_new_account_with_thin_history() {
        let adapter = CodeHostingAdapter::new();
        let reading = adapter
            .interpret("agent-1", &payload(Duration::days(90), 5, 0, 0, 1), &config())
            .unwrap();
        assert!((reading.computed_reliability - 0.7 * 0.57 * 0.7).abs() < 1e-9);

        let reading = adapter
            .interpret("agent-1", &payload(Duration::days(250), 50, 0, 0, 1), &config())
            .unwrap();
        assert!((reading.computed_reliability - 0.7 * 0.71).abs() < 1e-9);
    }

    #[test]
    fn test_stale_activity_discount() {
        let adapter = CodeHostingAdapter::new();
        let mut stale = payload(Duration::days(6 * 365), 500, 10, 10, 10);
        stale.body["last_active_at"] =
            json!((stale.fetched_at - Duration::days(500)).to_rfc3339());
        let reading = adapter.interpret("agent-1", &stale, &config()).unwrap();
        assert!((reading.computed_reliability - 0.7 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_values_stay_in_range() {
        let adapter = CodeHostingAdapter::new();
        let reading = adapter
            .interpret(
                "agent-1",
                &payload(Duration::days(20 * 365), 10_000_000, u64::MAX, u64::MAX, u64::MAX),
                &config(),
            )
            .unwrap();
        assert_eq!(reading.normalized_score, 1000);
        assert_eq!(reading.data_point_count, u64::MAX);
    }

    #[test]
    fn test_malformed_payloads() {
        let adapter = CodeHostingAdapter::new();

        let mut negative = payload(Duration::days(400), 10, 10, 10, 10);
        negative.body["total_stars"] = json!(-3);
        assert!(matches!(
            adapter.interpret("agent-1", &negative, &config()),
            Err(SourceError::InvalidPayload(_))
        ));

        let mut missing = payload(Duration::days(400), 10, 10, 10, 10);
        missing.body.as_object_mut().unwrap().remove("created_at");
        assert!(adapter.interpret("agent-1", &missing, &config()).is_err());

        let future = payload(Duration::days(-30), 10, 10, 10, 10);
        assert!(adapter.interpret("agent-1", &future, &config()).is_err());

        let text = RawPayload::now(json!("not a profile"));
        assert!(adapter.interpret("agent-1", &text, &config()).is_err());
    }

    #[test]
    fn test_declared_ceiling_applies() {
        let adapter = CodeHostingAdapter::new();
        let capped = config().with_declared_reliability(5000);
        let reading = adapter
            .interpret("agent-1", &payload(Duration::days(4 * 365), 1000, 100, 100, 20), &capped)
            .unwrap();
        assert_eq!(reading.computed_reliability, 0.5);
    }

    #[test]
    fn test_empty_profile_has_no_evidence() {
        let adapter = CodeHostingAdapter::new();
        let reading = adapter
            .interpret("agent-1", &payload(Duration::days(30), 0, 0, 0, 0), &config())
            .unwrap();
        assert_eq!(reading.data_point_count, 0);
        assert_eq!(reading.normalized_score, 50);
    }
}
