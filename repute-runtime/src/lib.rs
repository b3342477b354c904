//! Repute Runtime
//!
//! Wires the pure scoring core to the outside world:
//! - **Fetchers** supply raw payloads per source, concurrently
//! - **Engine** runs adapters, turns their failures into excluded entries,
//!   and aggregates
//! - **Cache** keeps the last report per agent for a TTL

pub mod fetch;
pub mod cache;
pub mod engine;

pub use fetch::*;
pub use cache::*;
pub use engine::*;
