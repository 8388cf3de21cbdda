//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, handler
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_forwards_total` (counter): upstream relays by target, outcome
//! - `gateway_submissions_total` (counter): submissions by branch
//! - `gateway_ws_peers` (gauge): currently connected UI sockets
//!
//! All helpers are no-ops until [`init_metrics`] installs a recorder, so
//! library users and tests pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint up"),
        Err(e) => tracing::error!(error = %e, "Could not install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, handler: &'static str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "handler" => handler,
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "handler" => handler)
        .record(start.elapsed().as_secs_f64());
}

/// Record one upstream relay attempt.
pub fn record_forward(target: &'static str, outcome: &'static str) {
    metrics::counter!(
        "gateway_forwards_total",
        "target" => target,
        "outcome" => outcome,
    )
    .increment(1);
}

/// Record which branch a nonce submission took.
pub fn record_submission(branch: &'static str) {
    metrics::counter!("gateway_submissions_total", "branch" => branch).increment(1);
}

/// Track the number of connected UI sockets.
pub fn record_ws_peers(count: usize) {
    metrics::gauge!("gateway_ws_peers").set(count as f64);
}
