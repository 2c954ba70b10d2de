//! Internal observability of the Vigil server.
//!
//! Currently a periodic logger of the monitoring registry.

pub mod stats_logger;

pub use stats_logger::{StatsDelta, StatsLogger};
