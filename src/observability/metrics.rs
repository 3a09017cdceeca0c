//! Metrics collection and exposition.
//!
//! # Metrics
//! - `portal_proxy_requests_total` (counter): proxied calls by method, status
//! - `portal_proxy_request_duration_seconds` (histogram): latency by method
//! - `portal_proxy_errors_total` (counter): calls answered by the proxy
//!   itself, by error tag
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished proxied call.
pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "portal_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("portal_proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a call the proxy answered itself instead of relaying.
pub fn record_error(tag: &'static str) {
    counter!("portal_proxy_errors_total", "error" => tag).increment(1);
}
