//! Integration tests for the OTLP gRPC receivers.
//!
//! These tests register the receivers over the store-backed processor and
//! call the `export` RPCs directly, checking stored data, returned status
//! codes and the monitoring counters.

use super::common::{
    get, metrics_request, otlp_gauge, otlp_span, otlp_summary, test_app, trace_request,
    CapturingRegistrar,
};
use api::grpc::{register_grpc_services, OtlpMonitoring};
use axum::http::StatusCode;
use shared::monitoring::{collect_flat, Mode};
use shared::otlp::proto::collector::metrics::v1::metrics_service_server::MetricsService;
use shared::otlp::proto::collector::trace::v1::trace_service_server::TraceService;
use tonic::{Code, Request};

fn registered() -> (axum::Router, api::AppState, CapturingRegistrar) {
    let (router, state) = test_app();
    let monitoring = OtlpMonitoring::new(state.registry()).unwrap();
    let mut registrar = CapturingRegistrar::default();
    register_grpc_services(
        &mut registrar,
        state.store_processor(),
        &monitoring,
        tracing::Span::none(),
    )
    .unwrap();
    (router, state, registrar)
}

#[tokio::test]
async fn test_traces_are_stored_and_counted() {
    let (router, state, registrar) = registered();
    let receiver = registrar.traces.unwrap();

    let mut child = otlp_span(0xab, 0x02, "load cart");
    child.parent_span_id = vec![0x01; 8];
    let request = trace_request("checkout", vec![otlp_span(0xab, 0x01, "GET /cart"), child]);

    let response = receiver.export(Request::new(request)).await.unwrap();
    assert!(response.into_inner().partial_success.is_none());

    assert_eq!(state.trace_store().span_count().unwrap(), 2);
    let trace_id = hex_id(0xab, 16);
    let (status, body) = get(router, &format!("/api/v1/traces/{trace_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["span_count"], 2);
    assert_eq!(body["root_span_id"], hex_id(0x01, 8));

    let flat = collect_flat(state.registry(), Mode::Reported);
    assert_eq!(flat["vigil.otlp.grpc.traces.request_count"], 1);
    assert_eq!(flat["vigil.otlp.grpc.traces.response_valid_count"], 1);
    assert_eq!(flat["vigil.otlp.grpc.metrics.request_count"], 0);
}

#[tokio::test]
async fn test_unsupported_metrics_are_dropped_and_reported() {
    let (router, state, registrar) = registered();
    let receiver = registrar.metrics.unwrap();

    let request = metrics_request(
        "billing",
        vec![
            otlp_gauge("queue_depth", 7.0),
            otlp_summary("latency"),
            otlp_summary("payload_size"),
        ],
    );
    receiver.export(Request::new(request)).await.unwrap();

    assert_eq!(state.metric_store().count().unwrap(), 1);
    let flat = collect_flat(state.registry(), Mode::Reported);
    assert_eq!(flat["vigil.otlp.grpc.metrics.consumer.unsupported_dropped"], 2);
    assert_eq!(flat["vigil.otlp.grpc.metrics.response_valid_count"], 1);

    let (status, body) = get(router.clone(), "/api/v1/metrics?name=queue_depth").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 1);

    let (status, body) = get(router, "/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["vigil"]["otlp"]["grpc"]["metrics"]["consumer"]["unsupported_dropped"],
        2
    );
}

#[tokio::test]
async fn test_invalid_span_rejects_whole_batch() {
    let (_router, state, registrar) = registered();
    let receiver = registrar.traces.unwrap();

    let mut backwards = otlp_span(0x0c, 0x02, "time travel");
    backwards.end_time_unix_nano = backwards.start_time_unix_nano - 1;
    let request = trace_request("checkout", vec![otlp_span(0x0c, 0x01, "fine"), backwards]);

    let status = receiver.export(Request::new(request)).await.unwrap_err();

    assert_eq!(status.code(), Code::InvalidArgument);
    assert_eq!(state.trace_store().span_count().unwrap(), 0);
    let flat = collect_flat(state.registry(), Mode::Reported);
    assert_eq!(flat["vigil.otlp.grpc.traces.response_errors_count"], 1);
    assert_eq!(flat["vigil.otlp.grpc.traces.response_count"], 1);
}

#[tokio::test]
async fn test_expired_deadline_maps_to_deadline_exceeded() {
    let (_router, state, registrar) = registered();
    let receiver = registrar.metrics.unwrap();

    let mut request = Request::new(metrics_request("billing", vec![otlp_gauge("x", 1.0)]));
    request
        .metadata_mut()
        .insert("grpc-timeout", "0n".parse().unwrap());

    let status = receiver.export(request).await.unwrap_err();

    assert_eq!(status.code(), Code::DeadlineExceeded);
    assert_eq!(state.metric_store().count().unwrap(), 0);
    let flat = collect_flat(state.registry(), Mode::Reported);
    assert_eq!(flat["vigil.otlp.grpc.metrics.response_errors_count"], 1);
}

fn hex_id(byte: u8, len: usize) -> String {
    format!("{byte:02x}").repeat(len)
}
