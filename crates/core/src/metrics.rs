//! Metrics definitions for connection resolution.
//!
//! This module defines all metrics recorded by the resolver.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "connection_requests_total",
        "Total number of connection pages requested"
    );
    describe_counter!(
        "connection_errors_total",
        "Total number of failed connection requests, by error kind"
    );
    describe_histogram!(
        "connection_resolve_duration_seconds",
        "Time taken to resolve one connection page in seconds"
    );
    describe_histogram!(
        "connection_edges_returned",
        "Number of edges returned per connection page"
    );
}

/// Record an incoming connection request.
pub fn record_connection_request(collection: &'static str) {
    counter!("connection_requests_total", "collection" => collection).increment(1);
}

/// Record a failed connection request.
///
/// # Arguments
/// * `collection` - The collection queried
/// * `kind` - Error kind, see [`crate::error::ConnectionError::kind`]
pub fn record_connection_error(collection: &'static str, kind: &'static str) {
    counter!("connection_errors_total", "collection" => collection, "kind" => kind).increment(1);
}

/// Record the size of a returned page.
pub fn record_edges_returned(collection: &'static str, count: usize) {
    histogram!("connection_edges_returned", "collection" => collection).record(count as f64);
}

/// A timer that records resolve duration when dropped.
pub struct ResolveTimer {
    collection: &'static str,
    start: Instant,
}

impl ResolveTimer {
    /// Start a new timer for `collection`.
    pub fn new(collection: &'static str) -> Self {
        Self {
            collection,
            start: Instant::now(),
        }
    }
}

impl Drop for ResolveTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        histogram!("connection_resolve_duration_seconds", "collection" => self.collection)
            .record(duration);
    }
}
