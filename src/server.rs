//! Scrape server setup and lifecycle.
//!
//! Wires the collectors and the network guard into an axum router:
//! - `/metrics` - Prometheus exposition, internal network only
//! - `/health` - Basic health check
//! - `/ready` - Readiness check
//!
//! Every route passes through the HTTP metrics middleware, so the scrape
//! server instruments its own traffic the same way an embedding service
//! would.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, Registry, TextEncoder};
use thiserror::Error;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::netguard::require_internal_network;
use crate::observability::http::track_http_metrics;
use crate::observability::Telemetry;

/// Errors raised while starting the scrape server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Shared router state.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<Registry>,
}

impl AppState {
    /// Create router state serving the given registry.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

/// Create the scrape router.
///
/// `/metrics` is reachable from the internal network only; every route is
/// instrumented by the HTTP metrics middleware.
pub fn create_router(state: AppState, telemetry: &Telemetry) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(require_internal_network))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(
                    Arc::clone(&telemetry.http),
                    track_http_metrics,
                )),
        )
        .with_state(state)
}

/// Handle GET /metrics - Prometheus text exposition.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {e}"),
        )
            .into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Handle GET /health - Basic health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Handle GET /ready - Readiness check.
async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, "READY")
}

/// Run the scrape server until `shutdown_rx` signals.
pub async fn run_server(
    config: Config,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    let addr_str = format!("{}:{}", config.host, config.port);
    let addr: SocketAddr = addr_str
        .parse()
        .map_err(|source| ServerError::InvalidAddress {
            addr: addr_str,
            source,
        })?;

    let telemetry = Telemetry::new(&config);
    let state = AppState::new(Arc::clone(&telemetry.registry));
    let app = create_router(state, &telemetry);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    tracing::info!(address = %addr, service = %config.service_name, "Starting metrics scrape server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.changed().await;
        tracing::info!("Scrape server shutting down");
    })
    .await
    .map_err(ServerError::Serve)?;

    Ok(())
}
