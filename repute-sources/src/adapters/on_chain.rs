//! On-chain payment history adapter
//!
//! Scores verified settlement events associated with the agent's address.
//! Events are cryptographically verifiable, so reliability starts near 1.0
//! and is discounted only when there are few events. Event age never matters.
//!
//! Raw score out of 100:
//! - Settlement count: up to 40
//! - Settled volume (whole token units): up to 40
//! - Clean record: up to 20
//!
//! Count and volume points are scaled down by the dispute rate.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use repute_core::{ConfigError, RawPayload, SourceConfig, SourceKind, SourceReading};

use crate::scoring::{ensure_not_future, SaturatingCurve};
use crate::traits::{
    invalid_option, parse_payload, reading_for, require_non_empty, SourceAdapter, SourceError,
};

static COUNT_CURVE: SaturatingCurve = SaturatingCurve::new(&[
    (0.0, 0.0),
    (1.0, 5.0),
    (10.0, 15.0),
    (100.0, 30.0),
    (1_000.0, 40.0),
]);

static VOLUME_CURVE: SaturatingCurve = SaturatingCurve::new(&[
    (0.0, 0.0),
    (10.0, 10.0),
    (100.0, 20.0),
    (1_000.0, 30.0),
    (10_000.0, 40.0),
]);

const CLEAN_RECORD_POINTS: f64 = 20.0;

/// Reliability of verified settlement evidence
pub const ON_CHAIN_BASE_RELIABILITY: f64 = 0.98;

const FEW_EVENTS: usize = 5;
const FEW_EVENTS_DISCOUNT: f64 = 0.6;
const SOME_EVENTS: usize = 20;
const SOME_EVENTS_DISCOUNT: f64 = 0.85;

/// Option key for the token's decimal places
pub const DECIMALS_OPTION: &str = "decimals";

/// Decimal places assumed when not configured (stablecoin units)
pub const DEFAULT_DECIMALS: u32 = 6;

const MAX_DECIMALS: u64 = 18;

#[derive(Debug, Deserialize)]
struct PaymentHistory {
    address: String,
    #[serde(default)]
    events: Vec<SettlementEvent>,
}

#[derive(Debug, Deserialize)]
struct SettlementEvent {
    /// Transaction signature, unique per settlement
    signature: String,
    /// Amount in the token's smallest unit
    amount: u64,
    settled_at: DateTime<Utc>,
    #[serde(default)]
    disputed: bool,
}

/// Totals over de-duplicated settlement events
#[derive(Debug, Clone, Copy, PartialEq)]
struct SettlementTotals {
    count: usize,
    disputed: usize,
    volume: u128,
}

impl SettlementTotals {
    fn dispute_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.disputed as f64 / self.count as f64
        }
    }
}

/// Adapter for on-chain settlement history
#[derive(Debug, Clone, Copy, Default)]
pub struct OnChainAdapter;

impl OnChainAdapter {
    pub fn new() -> Self {
        Self
    }

    fn decimals(config: &SourceConfig) -> u32 {
        config
            .options
            .get(DECIMALS_OPTION)
            .and_then(Value::as_u64)
            .map(|d| d.min(MAX_DECIMALS) as u32)
            .unwrap_or(DEFAULT_DECIMALS)
    }

    /// Validate events and total them, counting each signature once
    fn totals(history: &PaymentHistory, fetched_at: DateTime<Utc>) -> Result<SettlementTotals, SourceError> {
        let mut seen = HashSet::new();
        let mut totals = SettlementTotals {
            count: 0,
            disputed: 0,
            volume: 0,
        };

        for event in &history.events {
            require_non_empty("signature", &event.signature)?;
            ensure_not_future("settled_at", event.settled_at, fetched_at)?;
            if !seen.insert(event.signature.as_str()) {
                continue;
            }
            totals.count += 1;
            totals.volume = totals.volume.saturating_add(event.amount as u128);
            if event.disputed {
                totals.disputed += 1;
            }
        }

        Ok(totals)
    }

    /// Raw score out of 100
    fn raw_score(totals: &SettlementTotals, decimals: u32) -> f64 {
        if totals.count == 0 {
            return 0.0;
        }
        let whole_units = totals.volume as f64 / 10f64.powi(decimals as i32);
        let standing = 1.0 - totals.dispute_rate();
        (COUNT_CURVE.eval(totals.count as f64) + VOLUME_CURVE.eval(whole_units)) * standing
            + CLEAN_RECORD_POINTS * standing
    }

    fn reliability(totals: &SettlementTotals) -> f64 {
        let discount = match totals.count {
            n if n < FEW_EVENTS => FEW_EVENTS_DISCOUNT,
            n if n < SOME_EVENTS => SOME_EVENTS_DISCOUNT,
            _ => 1.0,
        };
        ON_CHAIN_BASE_RELIABILITY * discount
    }
}

impl SourceAdapter for OnChainAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::OnChainPaymentHistory
    }

    fn interpret(
        &self,
        agent_id: &str,
        payload: &RawPayload,
        config: &SourceConfig,
    ) -> Result<SourceReading, SourceError> {
        let history: PaymentHistory = parse_payload(self.kind(), payload)?;
        require_non_empty("address", &history.address)?;

        let totals = Self::totals(&history, payload.fetched_at)?;
        let raw = Self::raw_score(&totals, Self::decimals(config));
        let reliability = Self::reliability(&totals).min(config.reliability_ceiling());

        if totals.count < history.events.len() {
            debug!(
                "Ignored {} duplicate settlements for {}",
                history.events.len() - totals.count,
                agent_id
            );
        }
        debug!(
            "On-chain for {}: {} settlements, dispute rate {:.2}, raw {:.1}/100",
            agent_id,
            totals.count,
            totals.dispute_rate(),
            raw
        );

        Ok(reading_for(self.kind(), agent_id, payload)
            .score(raw * 10.0)
            .data_points(totals.count as u64)
            .reliability(reliability)
            .build())
    }

    fn validate_options(&self, config: &SourceConfig) -> Result<(), ConfigError> {
        match config.options.get(DECIMALS_OPTION) {
            None => Ok(()),
            Some(value) => match value.as_u64() {
                Some(d) if d <= MAX_DECIMALS => Ok(()),
                _ => Err(invalid_option(
                    config,
                    DECIMALS_OPTION,
                    format!("expected an integer in 0..={}, got {}", MAX_DECIMALS, value),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn config() -> SourceConfig {
        SourceConfig::new(SourceKind::OnChainPaymentHistory, 4000)
    }

    fn events(count: usize, amount: u64, disputed: usize) -> Vec<Value> {
        let at = (Utc::now() - Duration::days(10)).to_rfc3339();
        (0..count)
            .map(|i| {
                json!({
                    "signature": format!("sig-{}", i),
                    "amount": amount,
                    "settled_at": at,
                    "disputed": i < disputed,
                })
            })
            .collect()
    }

    fn history(events: Vec<Value>) -> RawPayload {
        RawPayload::now(json!({ "address": "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU", "events": events }))
    }

    #[test]
    fn test_clean_history() {
        let adapter = OnChainAdapter::new();
        // 100 settlements of 10 USDC each = 1000 units
        let reading = adapter
            .interpret("agent-1", &history(events(100, 10_000_000, 0)), &config())
            .unwrap();
        // (30 + 30) + 20
        assert_eq!(reading.normalized_score, 800);
        assert_eq!(reading.data_point_count, 100);
        assert!((reading.computed_reliability - 0.98).abs() < 1e-9);
    }

    #[test]
    fn test_disputes_reduce_score() {
        let adapter = OnChainAdapter::new();
        let clean = adapter
            .interpret("agent-1", &history(events(100, 10_000_000, 0)), &config())
            .unwrap();
        let disputed = adapter
            .interpret("agent-1", &history(events(100, 10_000_000, 25)), &config())
            .unwrap();
        // 80 points x 0.75 standing
        assert_eq!(disputed.normalized_score, 600);
        assert!(disputed.normalized_score < clean.normalized_score);

        let all_disputed = adapter
            .interpret("agent-1", &history(events(10, 10_000_000, 10)), &config())
            .unwrap();
        assert_eq!(all_disputed.normalized_score, 0);
    }

    #[test]
    fn test_low_counts_discount_reliability() {
        let adapter = OnChainAdapter::new();
        let few = adapter
            .interpret("agent-1", &history(events(3, 1_000_000, 0)), &config())
            .unwrap();
        assert!((few.computed_reliability - 0.98 * 0.6).abs() < 1e-9);

        let some = adapter
            .interpret("agent-1", &history(events(12, 1_000_000, 0)), &config())
            .unwrap();
        assert!((some.computed_reliability - 0.98 * 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_event_age_does_not_matter() {
        let adapter = OnChainAdapter::new();
        let recent = history(events(30, 1_000_000, 0));
        let mut old = recent.clone();
        for event in old.body["events"].as_array_mut().unwrap() {
            event["settled_at"] = json!((Utc::now() - Duration::days(3_000)).to_rfc3339());
        }
        let a = adapter.interpret("agent-1", &recent, &config()).unwrap();
        let b = adapter.interpret("agent-1", &old, &config()).unwrap();
        assert_eq!(a.computed_reliability, b.computed_reliability);
        assert_eq!(a.normalized_score, b.normalized_score);
    }

    #[test]
    fn test_duplicate_signatures_counted_once() {
        let adapter = OnChainAdapter::new();
        let mut replayed = events(5, 1_000_000, 0);
        replayed.extend(events(5, 1_000_000, 0));
        let reading = adapter
            .interpret("agent-1", &history(replayed), &config())
            .unwrap();
        assert_eq!(reading.data_point_count, 5);
    }

    #[test]
    fn test_decimals_option() {
        let adapter = OnChainAdapter::new();
        let nine = config().with_option(DECIMALS_OPTION, json!(9));
        assert!(adapter.validate_options(&nine).is_ok());
        let six = adapter
            .interpret("agent-1", &history(events(100, 10_000_000, 0)), &config())
            .unwrap();
        let nine_reading = adapter
            .interpret("agent-1", &history(events(100, 10_000_000, 0)), &nine)
            .unwrap();
        assert!(nine_reading.normalized_score < six.normalized_score);

        let bad = config().with_option(DECIMALS_OPTION, json!("six"));
        assert!(adapter.validate_options(&bad).is_err());
        let bad = config().with_option(DECIMALS_OPTION, json!(40));
        assert!(adapter.validate_options(&bad).is_err());
    }

    #[test]
    fn test_empty_history() {
        let adapter = OnChainAdapter::new();
        let reading = adapter
            .interpret("agent-1", &history(vec![]), &config())
            .unwrap();
        assert_eq!(reading.normalized_score, 0);
        assert_eq!(reading.data_point_count, 0);
    }

    #[test]
    fn test_extreme_volume_stays_in_range() {
        let adapter = OnChainAdapter::new();
        let reading = adapter
            .interpret("agent-1", &history(events(2_000, u64::MAX, 0)), &config())
            .unwrap();
        assert_eq!(reading.normalized_score, 1000);
    }

    #[test]
    fn test_malformed_history() {
        let adapter = OnChainAdapter::new();

        let no_address = RawPayload::now(json!({ "address": "", "events": [] }));
        assert!(matches!(
            adapter.interpret("agent-1", &no_address, &config()),
            Err(SourceError::InvalidPayload(_))
        ));

        let mut negative = events(1, 5, 0);
        negative[0]["amount"] = json!(-5);
        assert!(adapter.interpret("agent-1", &history(negative), &config()).is_err());

        let mut unsigned = events(1, 5, 0);
        unsigned[0]["signature"] = json!("");
        assert!(adapter.interpret("agent-1", &history(unsigned), &config()).is_err());

        let mut future = events(1, 5, 0);
        future[0]["settled_at"] = json!((Utc::now() + Duration::days(2)).to_rfc3339());
        assert!(adapter.interpret("agent-1", &history(future), &config()).is_err());
    }
}
