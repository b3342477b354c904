//! Repute Sources
//!
//! Evidence source adapters and their registry:
//! - **On-chain payment history**: verified settlement events
//! - **Code-hosting activity**: commits, stars, followers, repositories, account age
//! - **Attestation feed**: third-party scores on a declared scale
//! - **Operator webhook**: operator ratings on a declared scale
//!
//! Adapters never fetch anything. They validate an already-fetched payload,
//! score it, and report how reliable the evidence looked this time.
//!
//! ## Configuration
//!
//! Source weights and reliability ceilings are loaded from TOML files.
//! See [`config::load_sources`] and [`registry::SourceRegistry`].

pub mod traits;
pub mod scoring;
pub mod adapters;
pub mod registry;
pub mod config;

pub use traits::*;
pub use scoring::*;
pub use adapters::*;
pub use registry::*;
pub use config::*;
