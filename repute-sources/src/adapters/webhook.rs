//! Operator webhook adapter
//!
//! Operators push ratings for an agent on a scale they declare. The payload is
//! checked against the requested agent (a misrouted webhook is invalid), every
//! observation must lie inside the declared scale, and the score is the mean of
//! the rescaled observations.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use repute_core::{ConfigError, RawPayload, SourceConfig, SourceKind, SourceReading};

use crate::scoring::{
    ensure_not_future, max_scale_span, recency_factor, validate_scale_span, volume_factor,
    DeclaredScale,
};
use crate::traits::{
    invalid_option, parse_payload, reading_for, require_non_empty, SourceAdapter, SourceError,
};

/// Hard reliability ceiling for operator ratings
pub const WEBHOOK_RELIABILITY_CEILING: f64 = 0.5;

/// Observations needed for full volume credit
const OBSERVATION_SATURATION: u64 = 20;

/// Option key restricting which operators may report
pub const ALLOWED_OPERATORS_OPTION: &str = "allowed_operators";

#[derive(Debug, Deserialize)]
struct WebhookReport {
    operator_id: String,
    agent_id: String,
    scale_min: f64,
    scale_max: f64,
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    value: f64,
    observed_at: DateTime<Utc>,
}

/// Adapter for operator-supplied ratings
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhookAdapter;

impl WebhookAdapter {
    pub fn new() -> Self {
        Self
    }

    fn check_operator(config: &SourceConfig, operator_id: &str) -> Result<(), SourceError> {
        let Some(Value::Array(allowed)) = config.options.get(ALLOWED_OPERATORS_OPTION) else {
            return Ok(());
        };
        if allowed.iter().any(|op| op.as_str() == Some(operator_id)) {
            Ok(())
        } else {
            Err(SourceError::InvalidPayload(format!(
                "operator {} is not allowed to report",
                operator_id
            )))
        }
    }
}

impl SourceAdapter for WebhookAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::OperatorWebhook
    }

    fn interpret(
        &self,
        agent_id: &str,
        payload: &RawPayload,
        config: &SourceConfig,
    ) -> Result<SourceReading, SourceError> {
        let report: WebhookReport = parse_payload(self.kind(), payload)?;
        require_non_empty("operator_id", &report.operator_id)?;
        if report.agent_id != agent_id {
            return Err(SourceError::InvalidPayload(format!(
                "webhook addressed to {}, expected {}",
                report.agent_id, agent_id
            )));
        }
        Self::check_operator(config, &report.operator_id)?;

        let scale = DeclaredScale::new(report.scale_min, report.scale_max, max_scale_span(config))?;

        let mut total = 0.0;
        let mut newest: Option<DateTime<Utc>> = None;
        for observation in &report.observations {
            ensure_not_future("observed_at", observation.observed_at, payload.fetched_at)?;
            total += scale.normalize(observation.value)?;
            newest = newest.max(Some(observation.observed_at));
        }

        let count = report.observations.len() as u64;
        let (score, reliability) = match newest {
            Some(newest) => (
                total / count as f64,
                volume_factor(count, OBSERVATION_SATURATION)
                    * recency_factor(payload.fetched_at - newest),
            ),
            None => (0.0, 0.0),
        };
        let reliability = reliability
            .min(WEBHOOK_RELIABILITY_CEILING)
            .min(config.reliability_ceiling());

        debug!(
            "Webhook from {} for {}: {} observations, mean {:.1}",
            report.operator_id, agent_id, count, score
        );

        Ok(reading_for(self.kind(), agent_id, payload)
            .score(score)
            .data_points(count)
            .reliability(reliability)
            .build())
    }

    fn validate_options(&self, config: &SourceConfig) -> Result<(), ConfigError> {
        validate_scale_span(config)?;
        match config.options.get(ALLOWED_OPERATORS_OPTION) {
            None => Ok(()),
            Some(Value::Array(ops)) if ops.iter().all(Value::is_string) => Ok(()),
            Some(other) => Err(invalid_option(
                config,
                ALLOWED_OPERATORS_OPTION,
                format!("expected a list of operator ids, got {}", other),
            )),
        }
    }
}
