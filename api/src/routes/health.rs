//! Liveness endpoint for load balancers and orchestrators.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" when the server answers.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version of the running binary.
    pub version: &'static str,
}

/// Creates the health check routes.
pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "vigil-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}
