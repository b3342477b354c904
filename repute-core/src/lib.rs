//! Repute Core - Data model and aggregation for agent reputation
//!
//! This crate provides the foundational primitives:
//! - The closed set of evidence source kinds
//! - Per-source configuration (weights, reliability ceilings)
//! - Normalized source readings with payload digests
//! - The aggregator that fuses readings into one score, tier and confidence

pub mod kind;
pub mod config;
pub mod reading;
pub mod tier;
pub mod result;
pub mod aggregate;

pub use kind::*;
pub use config::*;
pub use reading::*;
pub use tier::*;
pub use result::*;
pub use aggregate::*;

/// Upper bound of the canonical score scale
pub const SCORE_MAX: u16 = 1000;

/// Basis points representing 100%
pub const BPS_MAX: u16 = 10_000;

/// Minimum reliability
pub const MIN_RELIABILITY: f64 = 0.0;

/// Maximum reliability
pub const MAX_RELIABILITY: f64 = 1.0;
