//! Common contract for source adapters

use serde::de::DeserializeOwned;
use thiserror::Error;

use repute_core::{ConfigError, RawPayload, ReadingBuilder, SourceConfig, SourceKind, SourceReading};

/// Errors from interpreting one source's payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Raw score {value} outside declared scale [{min}, {max}]")]
    OutOfRangeRawScore { value: f64, min: f64, max: f64 },
}

/// Common interface for all source adapters.
///
/// Implementations are pure: the same agent, payload and configuration always
/// produce the same reading. Adapters hold no mutable state, so one instance can
/// serve any number of agents concurrently.
pub trait SourceAdapter: Send + Sync {
    /// Source kind this adapter interprets
    fn kind(&self) -> SourceKind;

    /// Validate and normalize a fetched payload into a reading
    fn interpret(
        &self,
        agent_id: &str,
        payload: &RawPayload,
        config: &SourceConfig,
    ) -> Result<SourceReading, SourceError>;

    /// Check adapter-specific options before a configuration is accepted
    fn validate_options(&self, _config: &SourceConfig) -> Result<(), ConfigError> {
        Ok(())
    }
}

/// Deserialize a payload body into the adapter's typed view.
///
/// Missing or mistyped fields (including negative counts) become `InvalidPayload`.
pub fn parse_payload<T: DeserializeOwned>(
    kind: SourceKind,
    payload: &RawPayload,
) -> Result<T, SourceError> {
    if !payload.body.is_object() {
        return Err(SourceError::InvalidPayload(format!(
            "{} payload must be a JSON object",
            kind
        )));
    }
    T::deserialize(&payload.body)
        .map_err(|e| SourceError::InvalidPayload(format!("{} payload: {}", kind, e)))
}

/// Start a reading that carries the payload digest and fetch time
pub fn reading_for(kind: SourceKind, agent_id: &str, payload: &RawPayload) -> ReadingBuilder {
    SourceReading::builder(kind).payload(agent_id, payload)
}

/// Reject empty identifiers
pub fn require_non_empty(field: &str, value: &str) -> Result<(), SourceError> {
    if value.trim().is_empty() {
        return Err(SourceError::InvalidPayload(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Invalid-option error helper
pub fn invalid_option(config: &SourceConfig, option: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidOption {
        kind: config.kind,
        option: option.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Counts {
        count: u64,
    }

    #[test]
    fn test_parse_payload_requires_object() {
        let payload = RawPayload::new(json!([1, 2, 3]), Utc::now());
        let err = parse_payload::<Counts>(SourceKind::AttestationFeed, &payload).unwrap_err();
        assert!(matches!(err, SourceError::InvalidPayload(_)));
    }

    #[test]
    fn test_parse_payload_rejects_negative_counts() {
        let payload = RawPayload::new(json!({"count": -4}), Utc::now());
        assert!(parse_payload::<Counts>(SourceKind::AttestationFeed, &payload).is_err());

        let payload = RawPayload::new(json!({"count": 4, "extra": "ignored"}), Utc::now());
        let counts: Counts = parse_payload(SourceKind::AttestationFeed, &payload).unwrap();
        assert_eq!(counts.count, 4);
    }

    #[test]
    fn test_require_non_empty() {
        assert!(require_non_empty("address", "  ").is_err());
        assert!(require_non_empty("address", "So1ana").is_ok());
    }
}
