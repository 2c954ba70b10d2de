//! Telemetry kinds accepted by the OTLP intake.

use serde::{Deserialize, Serialize};

/// The kind of telemetry carried by an export request.
///
/// Each kind owns its own group of request/response counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelemetryKind {
    /// Distributed traces (spans).
    Traces,
    /// Metrics (counters, gauges, histograms).
    Metrics,
}

impl TelemetryKind {
    /// Returns the lowercase name used in registry paths and log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Traces => "traces",
            Self::Metrics => "metrics",
        }
    }
}

impl std::fmt::Display for TelemetryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
