//! HTTP route definitions.
//!
//! The gRPC receivers do the ingest; HTTP only exposes health, monitoring
//! stats and read access to what was stored.

mod health;
mod stats;
mod telemetry;

pub use health::health_routes;
pub use stats::stats_routes;
pub use telemetry::telemetry_routes;
