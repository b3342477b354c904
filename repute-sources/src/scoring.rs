//! Shared scoring helpers for adapters
//!
//! - Saturating breakpoint curves for counts
//! - Recency and volume factors for reliability
//! - Declared-scale validation for externally scored sources

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use repute_core::{ConfigError, SourceConfig, SCORE_MAX};

use crate::traits::{invalid_option, SourceError};

/// Allowed clock skew between a payload timestamp and its fetch time
pub const MAX_CLOCK_SKEW_SECS: i64 = 300;

/// Default widest declared scale accepted from an external scorer
pub const DEFAULT_MAX_SCALE_SPAN: f64 = 1_000_000.0;

/// Option key overriding [`DEFAULT_MAX_SCALE_SPAN`]
pub const MAX_SCALE_SPAN_OPTION: &str = "max_scale_span";

/// Piecewise-linear curve over ascending breakpoints, flat past the last one
#[derive(Debug, Clone, Copy)]
pub struct SaturatingCurve {
    points: &'static [(f64, f64)],
}

impl SaturatingCurve {
    pub const fn new(points: &'static [(f64, f64)]) -> Self {
        Self { points }
    }

    /// Evaluate the curve; inputs below the first breakpoint get its value
    pub fn eval(&self, x: f64) -> f64 {
        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        if x.is_nan() || x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }
        for pair in self.points.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if x <= x1 {
                return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
            }
        }
        last.1
    }

    /// Value at saturation
    pub fn max(&self) -> f64 {
        self.points.last().map(|p| p.1).unwrap_or(0.0)
    }
}

/// Reliability factor by evidence age: fresh evidence counts fully
pub fn recency_factor(age: Duration) -> f64 {
    match age.num_days() {
        d if d <= 30 => 1.0,
        d if d <= 180 => 0.8,
        _ => 0.5,
    }
}

/// Reliability factor by evidence volume: half credit for a single item,
/// full credit from `saturation` items on
pub fn volume_factor(count: u64, saturation: u64) -> f64 {
    if saturation == 0 {
        return 1.0;
    }
    0.5 + 0.5 * (count as f64 / saturation as f64).min(1.0)
}

/// Reject timestamps that lie after the fetch time (beyond clock skew)
pub fn ensure_not_future(
    field: &str,
    at: DateTime<Utc>,
    fetched_at: DateTime<Utc>,
) -> Result<(), SourceError> {
    if at - fetched_at > Duration::seconds(MAX_CLOCK_SKEW_SECS) {
        return Err(SourceError::InvalidPayload(format!(
            "{} {} is later than fetch time {}",
            field,
            at.to_rfc3339(),
            fetched_at.to_rfc3339()
        )));
    }
    Ok(())
}

/// A scale declared by an external scorer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeclaredScale {
    pub min: f64,
    pub max: f64,
}

impl DeclaredScale {
    /// Accept a declared scale only if it is finite, non-empty and not absurdly wide
    pub fn new(min: f64, max: f64, max_span: f64) -> Result<Self, SourceError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(SourceError::InvalidPayload(
                "declared scale bounds must be finite".to_string(),
            ));
        }
        if max <= min {
            return Err(SourceError::InvalidPayload(format!(
                "declared scale [{}, {}] is empty",
                min, max
            )));
        }
        if max - min > max_span {
            return Err(SourceError::InvalidPayload(format!(
                "declared scale [{}, {}] wider than {}",
                min, max, max_span
            )));
        }
        Ok(Self { min, max })
    }

    /// Map a value onto the canonical 0..=1000 scale.
    ///
    /// Values outside the declared bounds are rejected, never clamped.
    pub fn normalize(&self, value: f64) -> Result<f64, SourceError> {
        if !value.is_finite() {
            return Err(SourceError::InvalidPayload("score must be finite".to_string()));
        }
        if value < self.min || value > self.max {
            return Err(SourceError::OutOfRangeRawScore {
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok((value - self.min) / (self.max - self.min) * SCORE_MAX as f64)
    }
}

/// Configured widest declared scale
pub fn max_scale_span(config: &SourceConfig) -> f64 {
    config.f64_option(MAX_SCALE_SPAN_OPTION, DEFAULT_MAX_SCALE_SPAN)
}

/// Validate the `max_scale_span` option if present
pub fn validate_scale_span(config: &SourceConfig) -> Result<(), ConfigError> {
    match config.options.get(MAX_SCALE_SPAN_OPTION) {
        None => Ok(()),
        Some(Value::Number(n)) if n.as_f64().is_some_and(|v| v.is_finite() && v > 0.0) => Ok(()),
        Some(other) => Err(invalid_option(
            config,
            MAX_SCALE_SPAN_OPTION,
            format!("expected a positive number, got {}", other),
        )),
    }
}
