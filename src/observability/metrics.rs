//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ingress_requests_total` (counter): requests by method, status
//! - `ingress_request_duration_seconds` (histogram): dispatch latency by method
//! - `ingress_decode_errors_total` (counter): body decode failures by kind
//! - `ingress_preflight_total` (counter): answered CORS preflights
//!
//! Recording is always on and costs a no-op when no recorder is installed.
//! The Prometheus exporter is installed only when enabled in configuration.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS_TOTAL: &str = "ingress_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "ingress_request_duration_seconds";
pub const DECODE_ERRORS_TOTAL: &str = "ingress_decode_errors_total";
pub const PREFLIGHT_TOTAL: &str = "ingress_preflight_total";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_decode_error(kind: &'static str) {
    metrics::counter!(DECODE_ERRORS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_preflight() {
    metrics::counter!(PREFLIGHT_TOTAL).increment(1);
}
