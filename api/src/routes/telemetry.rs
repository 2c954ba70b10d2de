//! Read access to stored spans and metrics.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::models::{Metric, Span, Trace};
use shared::storage::TraceStoreError;

/// A trace in the response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TraceResponse {
    /// Trace identifier (hex).
    pub trace_id: String,
    /// Number of stored spans.
    pub span_count: usize,
    /// Span id of the root span, when it has been received.
    pub root_span_id: Option<String>,
    /// Spans ordered by start time.
    pub spans: Vec<Span>,
}

impl From<Trace> for TraceResponse {
    fn from(trace: Trace) -> Self {
        Self {
            trace_id: trace.trace_id.clone(),
            span_count: trace.span_count(),
            root_span_id: trace.root_span().map(|span| span.span_id.clone()),
            spans: trace.spans,
        }
    }
}

/// Query parameters for metric lookups.
#[derive(Debug, Deserialize)]
pub struct MetricParams {
    /// Metric name to look up.
    pub name: String,
}

/// Response for metric lookups.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetricResponse {
    /// Data points, oldest first.
    pub metrics: Vec<Metric>,
    /// Number of data points returned.
    pub total_count: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct TelemetryError {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable details.
    pub message: String,
}

type ApiError = (StatusCode, Json<TelemetryError>);

fn api_error(status: StatusCode, error: &str, message: String) -> ApiError {
    (
        status,
        Json(TelemetryError {
            error: error.to_string(),
            message,
        }),
    )
}

/// Creates the trace and metric lookup routes.
pub fn telemetry_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/traces/{trace_id}", get(get_trace))
        .route("/api/v1/metrics", get(get_metrics))
        .with_state(state)
}

async fn get_trace(
    State(state): State<AppState>,
    Path(trace_id): Path<String>,
) -> Result<Json<TraceResponse>, ApiError> {
    let trace = state.trace_store().get_trace(&trace_id).map_err(|e| match e {
        TraceStoreError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "not_found", e.to_string()),
        TraceStoreError::Poisoned => {
            tracing::error!(error = %e, "Failed to read trace store");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", e.to_string())
        }
    })?;

    Ok(Json(trace.into()))
}

async fn get_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricParams>,
) -> Result<Json<MetricResponse>, ApiError> {
    let metrics = state.metric_store().by_name(&params.name).map_err(|e| {
        tracing::error!(error = %e, "Failed to read metric store");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", e.to_string())
    })?;

    Ok(Json(MetricResponse {
        total_count: metrics.len(),
        metrics,
    }))
}
