//! Monitoring snapshot endpoint.
//!
//! `GET /stats` walks the monitoring registry and returns the nested counter
//! tree. `?mode=full` includes entries hidden from the reported view.

use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use shared::monitoring::{collect_structured, Mode};

/// Query parameters for `/stats`.
#[derive(Debug, Deserialize)]
pub struct StatsParams {
    /// `reported` (default) or `full`.
    pub mode: Option<String>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct StatsError {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable details.
    pub message: String,
}

/// Creates the stats routes.
pub fn stats_routes(state: AppState) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .with_state(state)
}

async fn get_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<StatsError>)> {
    let mode = match params.mode.as_deref() {
        None => Mode::default(),
        Some(raw) => raw.parse::<Mode>().map_err(|message| {
            (
                StatusCode::BAD_REQUEST,
                Json(StatsError {
                    error: "invalid_mode".to_string(),
                    message,
                }),
            )
        })?,
    };

    Ok(Json(collect_structured(state.registry(), mode)))
}
