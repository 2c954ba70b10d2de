//! Integration tests for the HTTP surface.
//!
//! Tests cover:
//! - Health check endpoint
//! - Stats snapshot before and after receiver registration
//! - Empty store lookups

use axum::http::StatusCode;

use super::common::{get, test_app, ScriptedConsumer};
use api::grpc::{register_consumer, GrpcServer, OtlpMonitoring};
use std::sync::Arc;

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = test_app();

    let (status, response) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "vigil-api");
}

#[tokio::test]
async fn test_stats_lists_receiver_groups() {
    let (app, state) = test_app();
    let monitoring = OtlpMonitoring::new(state.registry()).unwrap();

    let (status, before) = get(app.clone(), "/stats").await;
    assert_eq!(status, StatusCode::OK);
    let grpc = &before["vigil"]["otlp"]["grpc"];
    for kind in ["traces", "metrics"] {
        for counter in [
            "request_count",
            "response_count",
            "response_errors_count",
            "response_valid_count",
        ] {
            assert_eq!(grpc[kind][counter], 0, "{kind}.{counter}");
        }
    }
    assert!(grpc["metrics"].get("consumer").is_none());

    let mut server = GrpcServer::new(4 * 1024 * 1024);
    register_consumer(
        &mut server,
        Arc::new(ScriptedConsumer::always_ok().with_dropped(4)),
        &monitoring,
        tracing::Span::none(),
    )
    .unwrap();

    let (_, after) = get(app, "/stats?mode=full").await;
    assert_eq!(
        after["vigil"]["otlp"]["grpc"]["metrics"]["consumer"]["unsupported_dropped"],
        4
    );
}

#[tokio::test]
async fn test_empty_stores_return_empty_results() {
    let (app, _state) = test_app();

    let (status, response) = get(app.clone(), "/api/v1/metrics?name=anything").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_count"], 0);
    assert!(response["metrics"].as_array().unwrap().is_empty());

    let (status, response) = get(app, "/api/v1/traces/0123").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"], "not_found");
}
