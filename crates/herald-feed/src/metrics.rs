//! Metrics collection and export for Herald.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const PUBLISHED_TOTAL: &str = "herald_published_total";
    pub const PUBLISHED_BYTES: &str = "herald_published_bytes";
    pub const DELIVERED_TOTAL: &str = "herald_delivered_total";
    pub const DELIVERED_BYTES: &str = "herald_delivered_bytes";
    pub const ERRORS_TOTAL: &str = "herald_errors_total";
    pub const DELIVERY_LATENCY_SECONDS: &str = "herald_delivery_latency_seconds";
    pub const FEED_DEPTH: &str = "herald_feed_depth";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    // Describe metrics
    metrics::describe_counter!(
        names::PUBLISHED_TOTAL,
        "Total number of messages handed to the backend"
    );
    metrics::describe_counter!(
        names::PUBLISHED_BYTES,
        "Total content bytes handed to the backend"
    );
    metrics::describe_counter!(
        names::DELIVERED_TOTAL,
        "Total number of messages delivered to the feed"
    );
    metrics::describe_counter!(
        names::DELIVERED_BYTES,
        "Total content bytes delivered to the feed"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors by stage");
    metrics::describe_histogram!(
        names::DELIVERY_LATENCY_SECONDS,
        "Publish-to-delivery latency in seconds"
    );
    metrics::describe_gauge!(names::FEED_DEPTH, "Messages currently retained by the feed");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a successful publish.
pub fn record_published(bytes: usize) {
    counter!(names::PUBLISHED_TOTAL).increment(1);
    counter!(names::PUBLISHED_BYTES).increment(bytes as u64);
}

/// Record a delivery into the feed.
pub fn record_delivered(bytes: usize) {
    counter!(names::DELIVERED_TOTAL).increment(1);
    counter!(names::DELIVERED_BYTES).increment(bytes as u64);
}

/// Record publish-to-delivery latency.
pub fn record_delivery_latency(seconds: f64) {
    histogram!(names::DELIVERY_LATENCY_SECONDS).record(seconds);
}

/// Record an error at a pipeline stage.
pub fn record_error(stage: &str) {
    counter!(names::ERRORS_TOTAL, "stage" => stage.to_string()).increment(1);
}

/// Update the feed-depth gauge.
pub fn set_feed_depth(depth: usize) {
    gauge!(names::FEED_DEPTH).set(depth as f64);
}
