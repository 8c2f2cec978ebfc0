//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, mode
//! - `proxy_request_duration_seconds` (histogram): time to response head
//! - `proxy_html_rewrites_total` (counter): HTML bodies buffered, by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Mode label: `stream`, `rewrite`, `upgrade` or `error`

use std::net::SocketAddr;
use std::time::Instant;

use metrics::Label;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, mode: &'static str, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("status", status.to_string()),
        Label::new("mode", mode),
    ];
    metrics::counter!("proxy_requests_total", labels.clone()).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of an HTML rewrite.
pub fn record_rewrite(injected: bool) {
    let outcome = if injected { "injected" } else { "unchanged" };
    metrics::counter!("proxy_html_rewrites_total", "outcome" => outcome).increment(1);
}
