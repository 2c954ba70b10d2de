//! OTLP gRPC receivers with per-call monitoring.
//!
//! Implements the OpenTelemetry Protocol trace and metrics collector services
//! and wires them to a consumer through a [`MonitoredConsumer`], so every
//! export call is counted in the monitoring registry.
//!
//! # Services
//!
//! - `TraceService` - Receives traces via gRPC
//! - `MetricsService` - Receives metrics via gRPC

mod current;
mod monitored;
mod monitoring;
mod registrar;
mod services;

#[cfg(test)]
mod testing;

pub use current::CurrentConsumer;
pub use monitored::MonitoredConsumer;
pub use monitoring::{report_consumer_stats, OtlpMonitoring, METRICS_REGISTRY, TRACES_REGISTRY};
pub use registrar::{GrpcServer, ReceiverRegistrar, RegistrationError};
pub use services::{MetricsReceiver, TracesReceiver};

use anyhow::{Context as _, Result};
use shared::consumer::{Consumer, OtelConsumer};
use shared::processor::BatchProcessor;
use std::sync::Arc;
use tracing::Span;

/// Registers the OTLP trace and metrics receivers, feeding `processor`.
///
/// The processor is wrapped in an [`OtelConsumer`]; see [`register_consumer`]
/// for the remaining steps.
///
/// # Errors
///
/// Returns an error if either receiver cannot be registered.
pub fn register_grpc_services(
    server: &mut impl ReceiverRegistrar,
    processor: Arc<dyn BatchProcessor>,
    monitoring: &OtlpMonitoring,
    logger: Span,
) -> Result<()> {
    let consumer: Arc<dyn Consumer> = Arc::new(OtelConsumer::new(processor));
    register_consumer(server, consumer, monitoring, logger)
}

/// Registers the OTLP receivers over an arbitrary consumer.
///
/// Wraps `consumer` in a [`MonitoredConsumer`], installs it as the current
/// consumer for stats reporting, then registers the trace receiver followed
/// by the metrics receiver. The metrics receiver is not attempted when the
/// trace registration fails.
///
/// # Errors
///
/// Returns an error if either receiver cannot be registered.
pub fn register_consumer(
    server: &mut impl ReceiverRegistrar,
    consumer: Arc<dyn Consumer>,
    monitoring: &OtlpMonitoring,
    logger: Span,
) -> Result<()> {
    let monitored = Arc::new(MonitoredConsumer::new(consumer, monitoring, logger));
    monitoring.current().set(Arc::clone(&monitored));

    server
        .register_trace_receiver(TracesReceiver::new(monitored.clone()))
        .context("failed to register OTLP trace receiver")?;
    server
        .register_metrics_receiver(MetricsReceiver::new(monitored))
        .context("failed to register OTLP metrics receiver")?;

    tracing::info!("Registered OTLP gRPC receivers");
    Ok(())
}
