//! The consumer capability: what the receiver side hands decoded exports to.
//!
//! Receivers and the monitoring decorator only see the [`Consumer`] trait;
//! [`OtelConsumer`] is the implementation that turns OTLP exports into
//! batches for a [`crate::processor::BatchProcessor`].

mod otel;

pub use otel::OtelConsumer;

use crate::context::{Context, DeadlineExceeded};
use crate::otlp::proto::collector::{
    metrics::v1::ExportMetricsServiceRequest, trace::v1::ExportTraceServiceRequest,
};
use crate::processor::ProcessorError;
use serde::Serialize;
use thiserror::Error;

/// Decoded trace payload of one export call.
pub type Traces = ExportTraceServiceRequest;

/// Decoded metrics payload of one export call.
pub type Metrics = ExportMetricsServiceRequest;

/// Errors returned by a consume operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConsumerError {
    /// The call's deadline passed before processing finished.
    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),

    /// The batch processor rejected the batch.
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Point-in-time statistics kept by a consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    /// Metrics dropped because their data kind is not supported.
    pub unsupported_metrics_dropped: i64,
}

/// Accepts decoded telemetry and reports processing statistics.
#[tonic::async_trait]
pub trait Consumer: Send + Sync {
    /// Consumes one trace export.
    ///
    /// # Errors
    ///
    /// Returns an error if the traces could not be processed.
    async fn consume_traces(&self, ctx: &Context, traces: Traces) -> Result<(), ConsumerError>;

    /// Consumes one metrics export.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics could not be processed.
    async fn consume_metrics(&self, ctx: &Context, metrics: Metrics)
        -> Result<(), ConsumerError>;

    /// Returns a snapshot of the consumer's statistics.
    fn stats(&self) -> ConsumerStats;
}
