//! Per-source configuration
//!
//! Weights and reliability ceilings are expressed in basis points. The sum of
//! enabled weights does not have to be 10 000; the aggregator renormalizes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{SourceKind, BPS_MAX};

/// Errors from validating a source configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{kind}: {field} must be within 0..=10000 basis points, got {value}")]
    InvalidBasisPoints {
        kind: SourceKind,
        field: &'static str,
        value: u32,
    },

    #[error("{kind}: invalid option {option}: {reason}")]
    InvalidOption {
        kind: SourceKind,
        option: String,
        reason: String,
    },
}

/// Configuration for one source kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source this configuration applies to
    pub kind: SourceKind,
    /// Operator prior weight in basis points
    pub weight_bps: u32,
    /// Ceiling on the reliability any reading from this source may claim
    #[serde(default = "default_declared_reliability")]
    pub declared_reliability_bps: u32,
    /// Whether the source takes part in aggregation
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Adapter-specific options, validated by the adapter
    #[serde(default)]
    pub options: Map<String, Value>,
}

fn default_declared_reliability() -> u32 {
    BPS_MAX as u32
}

fn default_enabled() -> bool {
    true
}

impl SourceConfig {
    /// Enabled configuration with the given weight and no reliability ceiling
    pub fn new(kind: SourceKind, weight_bps: u32) -> Self {
        Self {
            kind,
            weight_bps,
            declared_reliability_bps: default_declared_reliability(),
            enabled: true,
            options: Map::new(),
        }
    }

    pub fn with_declared_reliability(mut self, bps: u32) -> Self {
        self.declared_reliability_bps = bps;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    /// Declared reliability as a fraction
    pub fn reliability_ceiling(&self) -> f64 {
        self.declared_reliability_bps.min(BPS_MAX as u32) as f64 / BPS_MAX as f64
    }

    /// Read a numeric option, falling back to a default when absent
    pub fn f64_option(&self, key: &str, default: f64) -> f64 {
        self.options.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Check basis-point ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limit = BPS_MAX as u32;
        if self.weight_bps > limit {
            return Err(ConfigError::InvalidBasisPoints {
                kind: self.kind,
                field: "weight_bps",
                value: self.weight_bps,
            });
        }
        if self.declared_reliability_bps > limit {
            return Err(ConfigError::InvalidBasisPoints {
                kind: self.kind,
                field: "declared_reliability_bps",
                value: self.declared_reliability_bps,
            });
        }
        Ok(())
    }
}
