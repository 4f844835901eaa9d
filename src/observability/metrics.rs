//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_connections_total` (counter): accepted connections
//! - `http_active_connections` (gauge): connections with a live worker
//! - `http_responses_total` (counter): responses written, by status
//! - `http_parse_errors_total` (counter): rejected requests, by error kind
//! - `http_accept_errors_total` (counter): transient accept failures
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened() {
    metrics::counter!("http_connections_total").increment(1);
    metrics::gauge!("http_active_connections").increment(1.0);
}

pub fn record_connection_closed() {
    metrics::gauge!("http_active_connections").decrement(1.0);
}

pub fn record_response(status: u16) {
    metrics::counter!("http_responses_total", "status" => status.to_string()).increment(1);
}

pub fn record_parse_error(kind: &'static str) {
    metrics::counter!("http_parse_errors_total", "kind" => kind).increment(1);
}

pub fn record_accept_error() {
    metrics::counter!("http_accept_errors_total").increment(1);
}
