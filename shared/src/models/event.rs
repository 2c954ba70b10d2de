//! Processor-facing events and batches.

use super::{Metric, Span};
use serde::{Deserialize, Serialize};

/// A single decoded telemetry item handed to a batch processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    /// A span from a trace export.
    Span(Span),
    /// A metric data point from a metrics export.
    Metric(Metric),
}

/// An ordered collection of events converted from one export request.
pub type Batch = Vec<Event>;
