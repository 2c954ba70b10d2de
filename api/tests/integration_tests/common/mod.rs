//! Common test utilities and helpers for integration tests.
//!
//! Provides the HTTP app setup, a registrar that keeps the receivers it is
//! handed, scriptable consumers and OTLP request builders.

use api::grpc::{MetricsReceiver, ReceiverRegistrar, RegistrationError, TracesReceiver};
use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use shared::consumer::{Consumer, ConsumerError, ConsumerStats, Metrics, Traces};
use shared::context::Context;
use shared::otlp::proto;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Creates a test router with fresh in-memory stores.
pub fn test_app() -> (Router, AppState) {
    let state = AppState::with_in_memory_store();
    let router = create_router(state.clone());
    (router, state)
}

/// Helper to make a GET request.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Registrar keeping the receivers so tests can call them directly.
#[derive(Default)]
pub struct CapturingRegistrar {
    pub traces: Option<TracesReceiver>,
    pub metrics: Option<MetricsReceiver>,
    pub fail_traces: bool,
}

impl ReceiverRegistrar for CapturingRegistrar {
    fn register_trace_receiver(
        &mut self,
        receiver: TracesReceiver,
    ) -> Result<(), RegistrationError> {
        if self.fail_traces {
            return Err(RegistrationError::AlreadyRegistered("trace"));
        }
        self.traces = Some(receiver);
        Ok(())
    }

    fn register_metrics_receiver(
        &mut self,
        receiver: MetricsReceiver,
    ) -> Result<(), RegistrationError> {
        self.metrics = Some(receiver);
        Ok(())
    }
}

/// How a [`ScriptedConsumer`] handles the n-th call (zero based).
pub type Script = fn(usize) -> Behavior;

/// Outcome of one scripted call.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Succeed after yielding to the scheduler this many times.
    Succeed { yields: usize },
    /// Fail with the error after yielding this many times.
    Fail { yields: usize, error: ConsumerError },
    /// Sleep, then succeed.
    Stall(Duration),
    /// Panic inside the consumer.
    Panic,
}

/// Consumer whose behaviour is scripted per call.
pub struct ScriptedConsumer {
    script: Script,
    calls: AtomicUsize,
    dropped: i64,
}

impl ScriptedConsumer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            dropped: 0,
        }
    }

    pub fn always_ok() -> Self {
        Self::new(|_| Behavior::Succeed { yields: 0 })
    }

    pub fn with_dropped(mut self, dropped: i64) -> Self {
        self.dropped = dropped;
        self
    }

    async fn run(&self) -> Result<(), ConsumerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match (self.script)(call) {
            Behavior::Succeed { yields } => {
                yield_times(yields).await;
                Ok(())
            }
            Behavior::Fail { yields, error } => {
                yield_times(yields).await;
                Err(error)
            }
            Behavior::Stall(duration) => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
            Behavior::Panic => panic!("scripted consumer panic"),
        }
    }
}

async fn yield_times(n: usize) {
    for _ in 0..n {
        tokio::task::yield_now().await;
    }
}

#[tonic::async_trait]
impl Consumer for ScriptedConsumer {
    async fn consume_traces(&self, _ctx: &Context, _traces: Traces) -> Result<(), ConsumerError> {
        self.run().await
    }

    async fn consume_metrics(
        &self,
        _ctx: &Context,
        _metrics: Metrics,
    ) -> Result<(), ConsumerError> {
        self.run().await
    }

    fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            unsupported_metrics_dropped: self.dropped,
        }
    }
}

fn string_value(value: &str) -> proto::common::v1::AnyValue {
    proto::common::v1::AnyValue {
        value: Some(proto::common::v1::any_value::Value::StringValue(
            value.to_string(),
        )),
    }
}

fn service_resource(service: &str) -> proto::resource::v1::Resource {
    proto::resource::v1::Resource {
        attributes: vec![proto::common::v1::KeyValue {
            key: "service.name".to_string(),
            value: Some(string_value(service)),
        }],
        dropped_attributes_count: 0,
    }
}

/// An OTLP span with 16-byte trace id `trace` and 8-byte span id `span`.
pub fn otlp_span(trace: u8, span: u8, name: &str) -> proto::trace::v1::Span {
    proto::trace::v1::Span {
        trace_id: vec![trace; 16],
        span_id: vec![span; 8],
        name: name.to_string(),
        kind: 2,
        start_time_unix_nano: 1_700_000_000_000_000_000,
        end_time_unix_nano: 1_700_000_000_250_000_000,
        ..Default::default()
    }
}

/// A trace export for `service` carrying `spans`.
pub fn trace_request(
    service: &str,
    spans: Vec<proto::trace::v1::Span>,
) -> proto::collector::trace::v1::ExportTraceServiceRequest {
    proto::collector::trace::v1::ExportTraceServiceRequest {
        resource_spans: vec![proto::trace::v1::ResourceSpans {
            resource: Some(service_resource(service)),
            scope_spans: vec![proto::trace::v1::ScopeSpans {
                scope: None,
                spans,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

/// A gauge metric with a single data point.
pub fn otlp_gauge(name: &str, value: f64) -> proto::metrics::v1::Metric {
    use proto::metrics::v1::{metric, number_data_point, Gauge, NumberDataPoint};

    proto::metrics::v1::Metric {
        name: name.to_string(),
        data: Some(metric::Data::Gauge(Gauge {
            data_points: vec![NumberDataPoint {
                time_unix_nano: 1_700_000_000_000_000_000,
                value: Some(number_data_point::Value::AsDouble(value)),
                ..Default::default()
            }],
        })),
        ..Default::default()
    }
}

/// A summary metric; summaries are not supported and get dropped.
pub fn otlp_summary(name: &str) -> proto::metrics::v1::Metric {
    use proto::metrics::v1::{metric, Summary, SummaryDataPoint};

    proto::metrics::v1::Metric {
        name: name.to_string(),
        data: Some(metric::Data::Summary(Summary {
            data_points: vec![SummaryDataPoint {
                count: 3,
                sum: 4.5,
                ..Default::default()
            }],
        })),
        ..Default::default()
    }
}

/// A metrics export for `service` carrying `metrics`.
pub fn metrics_request(
    service: &str,
    metrics: Vec<proto::metrics::v1::Metric>,
) -> proto::collector::metrics::v1::ExportMetricsServiceRequest {
    proto::collector::metrics::v1::ExportMetricsServiceRequest {
        resource_metrics: vec![proto::metrics::v1::ResourceMetrics {
            resource: Some(service_resource(service)),
            scope_metrics: vec![proto::metrics::v1::ScopeMetrics {
                scope: None,
                metrics,
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}
