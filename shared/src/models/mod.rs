//! Data models for the Vigil OTLP intake.
//!
//! Decoded OTLP payloads are converted into these types before being handed
//! to a batch processor.

pub mod event;
pub mod kind;
pub mod metric;
pub mod trace;

pub use event::{Batch, Event};
pub use kind::TelemetryKind;
pub use metric::{HistogramData, Metric, MetricData, MetricType, MetricValidationError};
pub use trace::{Span, SpanEvent, SpanKind, SpanStatus, SpanValidationError, Trace};

/// JSON-valued attributes keyed by attribute name.
pub type Attributes = std::collections::BTreeMap<String, serde_json::Value>;
