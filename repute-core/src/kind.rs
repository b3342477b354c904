//! Evidence source kinds
//!
//! The set is closed: each kind has exactly one adapter, and the declaration
//! order below is the order every breakdown is reported in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Categories of evidence the engine can combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Verified settlement events for the agent's address
    OnChainPaymentHistory,
    /// Activity on a code-hosting platform
    CodeHostingActivity,
    /// Scores published by a third-party attestation service
    AttestationFeed,
    /// Ratings pushed by an operator integration
    OperatorWebhook,
}

/// A kind name that is not part of the closed enumeration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown source kind: {0}")]
pub struct UnknownSourceKind(pub String);

impl SourceKind {
    /// All kinds in declaration order
    pub const ALL: [SourceKind; 4] = [
        SourceKind::OnChainPaymentHistory,
        SourceKind::CodeHostingActivity,
        SourceKind::AttestationFeed,
        SourceKind::OperatorWebhook,
    ];

    /// Stable snake_case name used in config files and payload maps
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::OnChainPaymentHistory => "on_chain_payment_history",
            SourceKind::CodeHostingActivity => "code_hosting_activity",
            SourceKind::AttestationFeed => "attestation_feed",
            SourceKind::OperatorWebhook => "operator_webhook",
        }
    }

    /// Position in declaration order
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for SourceKind {
    type Err = UnknownSourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownSourceKind(s.to_string()))
    }
}
