//! Database query metrics.
//!
//! Each executed statement is classified by operation, table, and
//! originating model, then recorded as a duration observation and a query
//! count. Model labels pass through the [`CardinalityLimiter`] so that
//! rarely-used models collapse into `other` instead of registering an
//! unbounded set of label combinations; table names are assumed naturally
//! bounded by schema size and are reported raw.

use std::sync::OnceLock;

use prometheus::{HistogramVec, IntCounterVec, Registry};
use regex::Regex;

use crate::observability::cardinality::{CardinalityLimiter, UNKNOWN_MODEL};
use crate::observability::registry;

/// Histogram buckets for query duration, in seconds.
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

/// How many context frames are inspected when resolving the model.
const MODEL_FRAME_LOOKBACK: usize = 20;

/// Table label when no table can be determined from the statement.
const UNKNOWN_TABLE: &str = "unknown";

/// One executed statement, as reported by the database layer.
///
/// `context` carries the type paths of the callers that issued the query,
/// innermost first, captured at the call site.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub sql: String,
    pub elapsed_ms: f64,
    pub context: Vec<String>,
}

/// Database query metrics collector.
///
/// Recording is best-effort: a collector whose registration failed is absent
/// and its samples are dropped, logged once at registration time.
pub struct DbQueryMetrics {
    service_name: String,
    limiter: CardinalityLimiter,
    query_duration: Option<HistogramVec>,
    queries_total: Option<IntCounterVec>,
}

impl DbQueryMetrics {
    /// Register the query metrics for `service_name` on `registry`.
    pub fn register(
        registry: &Registry,
        service_name: &str,
        limiter: CardinalityLimiter,
    ) -> Self {
        let query_duration = registry::register_histogram(
            registry,
            service_name,
            "db_query_duration_seconds",
            "Database query duration in seconds",
            &["service_name", "model", "operation"],
            DURATION_BUCKETS,
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Failed to register db_query_duration_seconds");
        })
        .ok();

        let queries_total = registry::register_counter(
            registry,
            service_name,
            "db_queries_total",
            "Total database queries",
            &["service_name", "table", "operation"],
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Failed to register db_queries_total");
        })
        .ok();

        Self {
            service_name: service_name.to_string(),
            limiter,
            query_duration,
            queries_total,
        }
    }

    /// Record one executed statement.
    ///
    /// Never fails outward; the statement has already executed by the time
    /// it is observed, and nothing here may disturb the caller.
    pub fn observe(&self, event: &QueryEvent) {
        let elapsed_secs = event.elapsed_ms / 1000.0;
        let operation = extract_operation(&event.sql);
        let table = extract_table(&event.sql);
        let model = extract_model(&event.context);

        // Only the duration histogram carries the model label, so only it
        // needs limiting; the raw table label stays intact on the counter.
        let limited_model = self.limiter.limit(&model);

        if let Some(histogram) = &self.query_duration {
            histogram
                .with_label_values(&[
                    self.service_name.as_str(),
                    limited_model.as_str(),
                    operation,
                ])
                .observe(elapsed_secs);
        }
        if let Some(counter) = &self.queries_total {
            counter
                .with_label_values(&[self.service_name.as_str(), table.as_str(), operation])
                .inc();
        }
    }
}

/// Classify the statement by its leading keyword.
fn extract_operation(sql: &str) -> &'static str {
    const OPERATIONS: [(&str, &str); 4] = [
        ("SELECT", "select"),
        ("INSERT", "insert"),
        ("UPDATE", "update"),
        ("DELETE", "delete"),
    ];

    let sql = sql.trim_start().as_bytes();
    for (keyword, operation) in OPERATIONS {
        if sql.len() >= keyword.len()
            && sql[..keyword.len()].eq_ignore_ascii_case(keyword.as_bytes())
        {
            return operation;
        }
    }

    "other"
}

fn table_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:from|into|update)\s+["`]?(\w+)"#).expect("table pattern is valid")
    })
}

/// First identifier following a FROM, INTO, or UPDATE keyword, with optional
/// backtick or double-quote delimiters.
fn extract_table(sql: &str) -> String {
    table_pattern()
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| UNKNOWN_TABLE.to_string(), |m| m.as_str().to_string())
}

/// Nearest context frame that names a model type: a type path ending in
/// `Model` or containing a `models` module segment. Only the last path
/// component is reported.
fn extract_model(context: &[String]) -> String {
    context
        .iter()
        .take(MODEL_FRAME_LOOKBACK)
        .find(|frame| frame.ends_with("Model") || frame.contains("::models::"))
        .map_or_else(
            || UNKNOWN_MODEL.to_string(),
            |frame| frame.rsplit("::").next().unwrap_or(frame.as_str()).to_string(),
        )
}
