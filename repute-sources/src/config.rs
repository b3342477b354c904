//! Source configuration loading
//!
//! Configurations live in TOML files with one `[[sources]]` table per kind:
//!
//! ```toml
//! [[sources]]
//! kind = "on_chain_payment_history"
//! weight_bps = 4000
//! declared_reliability_bps = 9800
//!
//! [sources.options]
//! decimals = 6
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use repute_core::{ConfigError, SourceConfig, SourceKind, UnknownSourceKind, BPS_MAX};

/// Errors from loading a sources file
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse sources file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    UnknownSourceKind(#[from] UnknownSourceKind),

    #[error("Source {0} configured more than once")]
    DuplicateKind(SourceKind),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// A sources file as written on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesFile {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// One `[[sources]]` table; `kind` stays a string until validated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub kind: String,
    pub weight_bps: u32,
    #[serde(default = "default_reliability")]
    pub declared_reliability_bps: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub options: Map<String, Value>,
}

fn default_reliability() -> u32 {
    BPS_MAX as u32
}

fn default_enabled() -> bool {
    true
}

impl SourcesFile {
    /// Validate entries into configurations
    pub fn into_configs(self) -> Result<Vec<SourceConfig>, LoadError> {
        let mut seen = HashSet::new();
        let mut configs = Vec::with_capacity(self.sources.len());

        for entry in self.sources {
            let kind: SourceKind = entry.kind.parse()?;
            if !seen.insert(kind) {
                return Err(LoadError::DuplicateKind(kind));
            }
            let config = SourceConfig {
                kind,
                weight_bps: entry.weight_bps,
                declared_reliability_bps: entry.declared_reliability_bps,
                enabled: entry.enabled,
                options: entry.options,
            };
            config.validate()?;
            configs.push(config);
        }

        configs.sort_by_key(|c| c.kind);
        Ok(configs)
    }

    /// File form of the given configurations
    pub fn from_configs<'a>(configs: impl IntoIterator<Item = &'a SourceConfig>) -> Self {
        Self {
            sources: configs
                .into_iter()
                .map(|c| SourceEntry {
                    kind: c.kind.name().to_string(),
                    weight_bps: c.weight_bps,
                    declared_reliability_bps: c.declared_reliability_bps,
                    enabled: c.enabled,
                    options: c.options.clone(),
                })
                .collect(),
        }
    }
}

/// Parse source configurations from TOML text
pub fn parse_sources(text: &str) -> Result<Vec<SourceConfig>, LoadError> {
    let file: SourcesFile = toml::from_str(text)?;
    file.into_configs()
}

/// Load source configurations from a TOML file
pub fn load_sources<P: AsRef<Path>>(path: P) -> Result<Vec<SourceConfig>, LoadError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_sources(&text)
}

/// Built-in weight and reliability ceiling per source
#[derive(Debug, Clone, Copy)]
pub struct DefaultSource {
    pub kind: SourceKind,
    pub weight_bps: u32,
    pub declared_reliability_bps: u32,
}

/// Default configuration table
pub static DEFAULT_SOURCES: &[DefaultSource] = &[
    DefaultSource {
        kind: SourceKind::OnChainPaymentHistory,
        weight_bps: 4000,
        declared_reliability_bps: 9800,
    },
    DefaultSource {
        kind: SourceKind::CodeHostingActivity,
        weight_bps: 2500,
        declared_reliability_bps: 7000,
    },
    DefaultSource {
        kind: SourceKind::AttestationFeed,
        weight_bps: 2000,
        declared_reliability_bps: 6000,
    },
    DefaultSource {
        kind: SourceKind::OperatorWebhook,
        weight_bps: 1500,
        declared_reliability_bps: 5000,
    },
];

/// Enabled default configuration for every kind
pub fn default_sources() -> Vec<SourceConfig> {
    DEFAULT_SOURCES
        .iter()
        .map(|d| SourceConfig::new(d.kind, d.weight_bps).with_declared_reliability(d.declared_reliability_bps))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[sources]]
kind = "operator_webhook"
weight_bps = 1000
enabled = false

[[sources]]
kind = "on_chain_payment_history"
weight_bps = 6000
declared_reliability_bps = 9800

[sources.options]
decimals = 9
"#;

    #[test]
    fn test_parse_sample() {
        let configs = parse_sources(SAMPLE).unwrap();
        assert_eq!(configs.len(), 2);
        // sorted into declaration order
        assert_eq!(configs[0].kind, SourceKind::OnChainPaymentHistory);
        assert_eq!(configs[0].f64_option("decimals", 6.0), 9.0);
        assert_eq!(configs[1].kind, SourceKind::OperatorWebhook);
        assert!(!configs[1].enabled);
        assert_eq!(configs[1].declared_reliability_bps, 10_000);
    }

    #[test]
    fn test_unknown_kind_fails() {
        let err = parse_sources("[[sources]]\nkind = \"reviews\"\nweight_bps = 10\n").unwrap_err();
        assert!(matches!(err, LoadError::UnknownSourceKind(_)));
    }

    #[test]
    fn test_duplicate_and_invalid_entries() {
        let dup = "[[sources]]\nkind = \"attestation_feed\"\nweight_bps = 10\n\
                   [[sources]]\nkind = \"attestation_feed\"\nweight_bps = 20\n";
        assert!(matches!(parse_sources(dup), Err(LoadError::DuplicateKind(_))));

        let heavy = "[[sources]]\nkind = \"attestation_feed\"\nweight_bps = 10001\n";
        assert!(matches!(parse_sources(heavy), Err(LoadError::Invalid(_))));

        assert!(matches!(parse_sources("sources = 3"), Err(LoadError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_sources("/nonexistent/sources.toml").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_defaults_roundtrip_through_toml() {
        let defaults = default_sources();
        let text = toml::to_string(&SourcesFile::from_configs(&defaults)).unwrap();
        assert_eq!(parse_sources(&text).unwrap(), defaults);
    }

    #[test]
    fn test_default_weights_sum_to_whole() {
        let total: u32 = DEFAULT_SOURCES.iter().map(|d| d.weight_bps).sum();
        assert_eq!(total, 10_000);
    }
}
