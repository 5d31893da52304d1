//! HTTP request metrics middleware.
//!
//! Times the downstream handler and records a duration observation plus a
//! request count keyed by service, method, templated endpoint, and status.
//! Dynamic path segments (UUIDs, numeric ids, opaque tokens) collapse into
//! placeholders so endpoint label cardinality stays bounded no matter how
//! many resource instances are requested.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use prometheus::{HistogramVec, IntCounterVec, Registry};
use regex::Regex;

use crate::observability::registry;

/// Histogram buckets for request duration, in seconds.
const DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.3, 0.5, 1.0, 3.0, 5.0];

const LABEL_NAMES: &[&str] = &["service_name", "method", "endpoint", "status"];

/// HTTP request metrics collector.
///
/// Recording is best-effort: a collector whose registration failed is absent
/// and its samples are dropped, logged once at registration time.
pub struct HttpMetrics {
    service_name: String,
    request_duration: Option<HistogramVec>,
    requests_total: Option<IntCounterVec>,
}

impl HttpMetrics {
    /// Register the HTTP request metrics for `service_name` on `registry`.
    pub fn register(registry: &Registry, service_name: &str) -> Self {
        let request_duration = registry::register_histogram(
            registry,
            service_name,
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            LABEL_NAMES,
            DURATION_BUCKETS,
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to register http_request_duration_seconds");
        })
        .ok();

        let requests_total = registry::register_counter(
            registry,
            service_name,
            "http_requests_total",
            "Total HTTP requests",
            LABEL_NAMES,
        )
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to register http_requests_total");
        })
        .ok();

        Self {
            service_name: service_name.to_string(),
            request_duration,
            requests_total,
        }
    }

    /// Record one completed request.
    pub fn record(&self, method: &str, endpoint: &str, status: u16, elapsed_secs: f64) {
        let status = status.to_string();
        let labels = [self.service_name.as_str(), method, endpoint, status.as_str()];

        if let Some(histogram) = &self.request_duration {
            histogram.with_label_values(&labels).observe(elapsed_secs);
        }
        if let Some(counter) = &self.requests_total {
            counter.with_label_values(&labels).inc();
        }
    }
}

/// Axum middleware that times the downstream handler and records request
/// metrics.
///
/// The handler runs exactly once and its response is returned unchanged
/// regardless of recording outcome.
pub async fn track_http_metrics(
    State(metrics): State<Arc<HttpMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = normalize_endpoint(request.uri().path());

    let response = next.run(request).await;

    let elapsed = start.elapsed().as_secs_f64();
    metrics.record(&method, &endpoint, response.status().as_u16(), elapsed);

    response
}

fn uuid_segment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new("(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .expect("uuid pattern is valid")
    })
}

fn token_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("/[a-zA-Z0-9]{20,}").expect("token pattern is valid"))
}

/// Normalize a request path into a bounded-cardinality endpoint template.
///
/// UUID-shaped segments become `{uuid}`, purely numeric segments `{id}`, and
/// slash-prefixed alphanumeric runs of 20 or more characters `{token}`,
/// substituted in that order. A segment containing any non-digit character
/// is not an id. The result always starts with a single `/`; the empty path
/// maps to `/`. Applying the function twice yields the same result as
/// applying it once.
pub fn normalize_endpoint(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }

    let path = uuid_segment().replace_all(trimmed, "{uuid}");

    let path = path
        .split('/')
        .enumerate()
        .map(|(i, segment)| {
            // Only segments preceded by a slash are id candidates.
            if i > 0 && !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    let path = token_run().replace_all(&path, "/{token}");

    format!("/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;
    use uuid::Uuid;

    #[test]
    fn test_normalize_root_and_empty() {
        assert_eq!(normalize_endpoint(""), "/");
        assert_eq!(normalize_endpoint("/"), "/");
        assert_eq!(normalize_endpoint("///"), "/");
    }

    #[test]
    fn test_normalize_plain_path_is_untouched() {
        assert_eq!(normalize_endpoint("/api/products"), "/api/products");
        assert_eq!(normalize_endpoint("api/products/"), "/api/products");
    }

    #[test]
    fn test_normalize_numeric_segments() {
        assert_eq!(normalize_endpoint("/users/123"), "/users/{id}");
        assert_eq!(
            normalize_endpoint("/users/123/orders/456"),
            "/users/{id}/orders/{id}"
        );
        // A segment with any non-digit character is not an id.
        assert_eq!(normalize_endpoint("/users/12a"), "/users/12a");
    }

    #[test]
    fn test_normalize_uuid_segments() {
        let id = Uuid::new_v4();
        let normalized = normalize_endpoint(&format!("/products/{id}"));
        assert_eq!(normalized, "/products/{uuid}");
        assert!(!normalized.contains(&id.to_string()));

        // Case-insensitive.
        let upper = id.to_string().to_uppercase();
        assert_eq!(
            normalize_endpoint(&format!("/products/{upper}")),
            "/products/{uuid}"
        );
    }

    #[test]
    fn test_normalize_token_segments() {
        assert_eq!(
            normalize_endpoint("/verify/a1B2c3D4e5F6g7H8i9J0k1L2"),
            "/verify/{token}"
        );
        // 19 characters is below the token threshold.
        assert_eq!(
            normalize_endpoint("/verify/abcdefghij123456789"),
            "/verify/abcdefghij123456789"
        );
    }

    #[test]
    fn test_normalize_mixed_path() {
        let id = Uuid::new_v4();
        assert_eq!(
            normalize_endpoint(&format!("/users/42/sessions/{id}")),
            "/users/{id}/sessions/{uuid}"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let uuid_path = format!("/products/{}", Uuid::new_v4());
        let paths = [
            "",
            "/",
            "/api/products",
            "/users/123/orders/456",
            uuid_path.as_str(),
            "/verify/a1B2c3D4e5F6g7H8i9J0k1L2",
            "/users/12a/x",
        ];
        for path in paths {
            let once = normalize_endpoint(path);
            assert_eq!(normalize_endpoint(&once), once, "not idempotent: {path}");
        }
    }

    #[test]
    fn test_record_populates_registry() {
        let registry = Registry::new();
        let metrics = HttpMetrics::register(&registry, "testsvc");

        metrics.record("GET", "/users/{id}", 200, 0.042);

        let families = registry.gather();
        let counter = families
            .iter()
            .find(|f| f.get_name() == "testsvc_http_requests_total")
            .expect("counter family present");
        let metric = &counter.get_metric()[0];
        assert_eq!(metric.get_counter().get_value() as u64, 1);

        let labels: Vec<(&str, &str)> = metric
            .get_label()
            .iter()
            .map(|l| (l.get_name(), l.get_value()))
            .collect();
        assert!(labels.contains(&("endpoint", "/users/{id}")));
        assert!(labels.contains(&("status", "200")));
    }

    // Force every registration to fail by pre-registering conflicting shapes,
    // then check the middleware still hands the response through.
    #[tokio::test]
    async fn test_response_is_returned_when_registration_failed() {
        let registry = Registry::new();
        for name in ["http_request_duration_seconds", "http_requests_total"] {
            crate::observability::registry::register_counter(
                &registry,
                "testsvc",
                name,
                "conflicting shape",
                &["unrelated"],
            )
            .expect("conflicting registration succeeds");
        }

        let metrics = Arc::new(HttpMetrics::register(&registry, "testsvc"));
        assert!(metrics.request_duration.is_none());
        assert!(metrics.requests_total.is_none());

        let app = Router::new()
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .layer(axum::middleware::from_fn_with_state(
                metrics,
                track_http_metrics,
            ));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/teapot")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router call succeeds");

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
