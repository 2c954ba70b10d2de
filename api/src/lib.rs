//! Vigil Server
//!
//! This crate provides the OTLP gRPC intake of Vigil together with its HTTP
//! surface for health checks, monitoring stats and stored telemetry.
//!
//! # Architecture
//!
//! The server is built on Tokio and runs two listeners side by side:
//! - tonic gRPC: the OTLP `TraceService` and `MetricsService`, each call
//!   counted by a monitored consumer before it reaches the batch processor
//! - Axum HTTP: `/health`, `/stats` and read-only lookups of stored data
//!
//! A stats logger periodically writes the counters that changed.
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod grpc;
pub mod metrics;
mod routes;
mod state;

pub use config::Config;
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use grpc::{register_grpc_services, GrpcServer, OtlpMonitoring};
use metrics::StatsLogger;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

/// Runs the Vigil server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - Either server fails to bind to its configured address
/// - The OTLP receivers cannot be registered
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Vigil server with the provided configuration.
///
/// # Errors
///
/// Returns an error if:
/// - Either server fails to bind to its configured address
/// - The OTLP receivers cannot be registered
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let http_addr = config.http_addr()?;
    let grpc_addr = config.grpc_addr()?;

    tracing::info!(
        host = %config.host,
        http_port = config.http_port,
        grpc_port = config.grpc_port,
        "Vigil server starting"
    );

    let state = AppState::with_in_memory_store();
    let monitoring =
        OtlpMonitoring::new(state.registry()).context("failed to set up OTLP monitoring")?;

    let mut grpc_server = GrpcServer::new(config.max_recv_msg_size_bytes());
    register_grpc_services(
        &mut grpc_server,
        state.store_processor(),
        &monitoring,
        tracing::info_span!("otlp_receiver", protocol = "grpc"),
    )?;

    let stats_logger = match config.stats_log_interval() {
        Some(interval) => {
            let logger = Arc::new(StatsLogger::new(Arc::clone(state.registry()), interval));
            Some(tokio::spawn(logger.run()))
        }
        None => {
            tracing::info!("Stats logger disabled");
            None
        }
    };

    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {http_addr}"))?;
    tracing::info!(%http_addr, %grpc_addr, "Listening for connections");

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_tx.send_replace(());
    });

    let http = axum::serve(listener, create_router(state))
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let grpc = grpc_server.serve_with_shutdown(grpc_addr, wait_for_shutdown(shutdown_rx));

    let served = tokio::try_join!(
        async { http.await.context("HTTP server failed") },
        async { grpc.await.context("gRPC server failed") },
    );

    if let Some(handle) = stats_logger {
        handle.abort();
    }
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the HTTP router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::stats_routes(state.clone()))
        .merge(routes::telemetry_routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Resolves once shutdown was signalled or the sender is gone.
fn wait_for_shutdown(mut rx: watch::Receiver<()>) -> impl Future<Output = ()> {
    async move {
        let _ = rx.changed().await;
    }
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
