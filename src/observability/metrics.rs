//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_requests_total` (counter): requests by destination, status
//! - `edge_request_duration_seconds` (histogram): time to response head
//! - `edge_upstream_errors_total` (counter): failed upstream calls by destination
//! - `edge_streams_total` (counter): event streams by outcome
//! - `edge_log_events_failed_total` (counter): events the sink refused, by kind
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a request whose response head was produced.
pub fn record_request(destination: &'static str, status: u16, start: Instant) {
    counter!(
        "edge_requests_total",
        "destination" => destination,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("edge_request_duration_seconds", "destination" => destination)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(destination: &'static str) {
    counter!("edge_upstream_errors_total", "destination" => destination).increment(1);
}

/// Record how an event stream ended: "completed", "log_failed", "aborted"
/// or "disconnected".
pub fn record_stream(outcome: &'static str) {
    counter!("edge_streams_total", "outcome" => outcome).increment(1);
}

pub fn record_event_failed(kind: &'static str) {
    counter!("edge_log_events_failed_total", "kind" => kind).increment(1);
}
