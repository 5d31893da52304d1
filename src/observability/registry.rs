//! Registration helpers over the Prometheus registry.
//!
//! Collectors are namespaced by service name and registered once at
//! construction. Registration can fail on name or label-shape conflicts;
//! callers treat a failed registration as a dropped sample stream rather
//! than an error worth propagating.

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

/// Build and register a histogram vector under the service namespace.
pub fn register_histogram(
    registry: &Registry,
    service: &str,
    name: &str,
    help: &str,
    label_names: &[&str],
    buckets: &[f64],
) -> Result<HistogramVec, prometheus::Error> {
    let opts = HistogramOpts::new(name, help)
        .namespace(service.to_string())
        .buckets(buckets.to_vec());
    let histogram = HistogramVec::new(opts, label_names)?;
    registry.register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

/// Build and register a counter vector under the service namespace.
pub fn register_counter(
    registry: &Registry,
    service: &str,
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntCounterVec, prometheus::Error> {
    let opts = Opts::new(name, help).namespace(service.to_string());
    let counter = IntCounterVec::new(opts, label_names)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_histogram_is_namespaced() {
        let registry = Registry::new();
        let histogram = register_histogram(
            &registry,
            "testsvc",
            "request_seconds",
            "Request duration",
            &["endpoint"],
            &[0.1, 1.0],
        )
        .expect("registration succeeds");

        histogram.with_label_values(&["/"]).observe(0.05);

        let families = registry.gather();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].get_name(), "testsvc_request_seconds");
    }

    #[test]
    fn test_conflicting_shape_is_rejected() {
        let registry = Registry::new();
        register_counter(&registry, "testsvc", "events_total", "Events", &["kind"])
            .expect("first registration succeeds");

        // Same fully-qualified name, different label set.
        let conflict = register_counter(
            &registry,
            "testsvc",
            "events_total",
            "Events",
            &["kind", "source"],
        );
        assert!(conflict.is_err());
    }
}
