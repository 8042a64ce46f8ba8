//! Metrics definitions for the data access layer.
//!
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`. Without an installed
//! recorder every call here is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "backend_queries_total",
        "Total number of GraphQL queries sent to backends"
    );
    describe_counter!(
        "backend_query_errors_total",
        "Total number of failed backend queries"
    );
    describe_histogram!(
        "backend_query_duration_seconds",
        "Round-trip time of a backend query in seconds"
    );
    describe_counter!(
        "runtime_spec_cache_hits_total",
        "Runtime spec lookups served from the cache"
    );
    describe_counter!(
        "runtime_spec_cache_misses_total",
        "Runtime spec lookups that required a backend fetch"
    );
    describe_counter!(
        "runtime_spec_decodes_total",
        "Total number of metadata payloads decoded"
    );
}

/// Record a query sent to a backend.
pub fn record_query(backend: &str) {
    counter!("backend_queries_total", "backend" => backend.to_string()).increment(1);
}

/// Record a failed backend query.
///
/// # Arguments
/// * `backend` - The backend name
/// * `kind` - Error kind ("network", "http", "backend", ...)
pub fn record_query_error(backend: &str, kind: &str) {
    counter!("backend_query_errors_total", "backend" => backend.to_string(), "kind" => kind.to_string())
        .increment(1);
}

/// Record runtime spec cache hits.
pub fn record_cache_hits(count: u64) {
    counter!("runtime_spec_cache_hits_total").increment(count);
}

/// Record runtime spec cache misses.
pub fn record_cache_misses(count: u64) {
    counter!("runtime_spec_cache_misses_total").increment(count);
}

/// Record a metadata decode.
pub fn record_metadata_decode() {
    counter!("runtime_spec_decodes_total").increment(1);
}

/// A timer that records the query duration when dropped.
pub struct QueryTimer {
    backend: &'static str,
    start: Instant,
}

impl QueryTimer {
    /// Start timing a query against `backend`.
    pub fn new(backend: &'static str) -> Self {
        Self {
            backend,
            start: Instant::now(),
        }
    }
}

impl Drop for QueryTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        histogram!("backend_query_duration_seconds", "backend" => self.backend).record(duration);
    }
}
