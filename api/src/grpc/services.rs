//! OTLP collector gRPC services handing exports to a [`Consumer`].

use shared::consumer::{Consumer, ConsumerError};
use shared::context::Context;
use shared::otlp::proto::collector::metrics::v1::{
    metrics_service_server::MetricsService, ExportMetricsServiceRequest,
    ExportMetricsServiceResponse,
};
use shared::otlp::proto::collector::trace::v1::{
    trace_service_server::TraceService, ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use shared::processor::ProcessorError;
use std::sync::Arc;
use std::time::Duration;
use tonic::{Request, Response, Status};

/// Implementation of the OTLP `TraceService` gRPC service.
#[derive(Clone)]
pub struct TracesReceiver {
    consumer: Arc<dyn Consumer>,
}

impl TracesReceiver {
    /// Creates a receiver handing every export to `consumer`.
    #[must_use]
    pub fn new(consumer: Arc<dyn Consumer>) -> Self {
        Self { consumer }
    }
}

#[tonic::async_trait]
impl TraceService for TracesReceiver {
    async fn export(
        &self,
        request: Request<ExportTraceServiceRequest>,
    ) -> Result<Response<ExportTraceServiceResponse>, Status> {
        let ctx = context_from_request(&request);
        self.consumer
            .consume_traces(&ctx, request.into_inner())
            .await
            .map_err(status_from_error)?;

        Ok(Response::new(ExportTraceServiceResponse {
            partial_success: None,
        }))
    }
}

/// Implementation of the OTLP `MetricsService` gRPC service.
#[derive(Clone)]
pub struct MetricsReceiver {
    consumer: Arc<dyn Consumer>,
}

impl MetricsReceiver {
    /// Creates a receiver handing every export to `consumer`.
    #[must_use]
    pub fn new(consumer: Arc<dyn Consumer>) -> Self {
        Self { consumer }
    }
}

#[tonic::async_trait]
impl MetricsService for MetricsReceiver {
    async fn export(
        &self,
        request: Request<ExportMetricsServiceRequest>,
    ) -> Result<Response<ExportMetricsServiceResponse>, Status> {
        let ctx = context_from_request(&request);
        self.consumer
            .consume_metrics(&ctx, request.into_inner())
            .await
            .map_err(status_from_error)?;

        Ok(Response::new(ExportMetricsServiceResponse {
            partial_success: None,
        }))
    }
}

/// Builds the call context from the `grpc-timeout` header and peer address.
fn context_from_request<T>(request: &Request<T>) -> Context {
    let mut ctx = Context::background();
    if let Some(timeout) = request
        .metadata()
        .get("grpc-timeout")
        .and_then(|value| value.to_str().ok())
        .and_then(parse_grpc_timeout)
    {
        ctx = ctx.with_timeout(timeout);
    }
    if let Some(addr) = request.remote_addr() {
        ctx = ctx.with_peer_addr(addr);
    }
    ctx
}

/// Parses a `grpc-timeout` value: up to eight digits followed by a unit.
fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    if value.len() < 2 || value.len() > 9 || !value.is_ascii() {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;
    let timeout = match unit {
        "H" => Duration::from_secs(amount.checked_mul(3600)?),
        "M" => Duration::from_secs(amount.checked_mul(60)?),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}

/// Maps a consumer error onto the gRPC status returned to the exporter.
fn status_from_error(err: ConsumerError) -> Status {
    match &err {
        ConsumerError::DeadlineExceeded(_) => Status::deadline_exceeded(err.to_string()),
        ConsumerError::Processor(ProcessorError::InvalidEvents { .. }) => {
            Status::invalid_argument(err.to_string())
        }
        ConsumerError::Processor(ProcessorError::Storage(_)) => {
            Status::unavailable(err.to_string())
        }
        _ => Status::internal(err.to_string()),
    }
}
