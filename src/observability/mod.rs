//! Telemetry collectors and logging infrastructure.
//!
//! Provides:
//! - HTTP request metrics with endpoint templating
//! - Database query metrics with top-N model cardinality limiting
//! - Registration helpers over the Prometheus registry
//! - Structured logging setup

pub mod cardinality;
pub mod db;
pub mod http;
pub mod registry;
pub mod tracing;

use std::sync::Arc;
use std::time::Duration;

use prometheus::Registry;

use crate::config::Config;
use crate::observability::cardinality::CardinalityLimiter;
use crate::observability::db::DbQueryMetrics;
use crate::observability::http::HttpMetrics;

/// The collectors of one service instance, registered on a shared registry.
///
/// Embedding applications construct one `Telemetry` at startup, feed HTTP
/// traffic through [`http::track_http_metrics`] and query events into
/// [`DbQueryMetrics::observe`], and expose `registry` through the scrape
/// server.
pub struct Telemetry {
    pub registry: Arc<Registry>,
    pub http: Arc<HttpMetrics>,
    pub db: Arc<DbQueryMetrics>,
}

impl Telemetry {
    /// Register all collectors for the configured service on a fresh
    /// registry.
    pub fn new(config: &Config) -> Self {
        let registry = Arc::new(Registry::new());

        let http = Arc::new(HttpMetrics::register(&registry, &config.service_name));

        let limiter = CardinalityLimiter::new(
            config.top_models_limit,
            Duration::from_secs(config.model_reset_interval_secs),
        );
        let db = Arc::new(DbQueryMetrics::register(
            &registry,
            &config.service_name,
            limiter,
        ));

        Self { registry, http, db }
    }
}
