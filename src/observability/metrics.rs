//! Metrics collection and exposition.
//!
//! # Metrics
//! - `crowdfund_flow_total` (counter): funded flows by action and outcome
//! - `crowdfund_flow_duration_seconds` (histogram): flow latency by action
//! - `crowdfund_proxy_requests_total` (counter): gateway proxy requests by
//!   route and status
//! - `crowdfund_rpc_failover_total` (counter): RPC endpoint failures by method
//!
//! # Design Decisions
//! - Recording is always safe; without an installed recorder the macros
//!   drop the sample
//! - Labels stay low-cardinality (no fund ids, no wallet addresses)

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics listener started"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Record a finished funded flow.
pub fn record_flow(action: &'static str, outcome: &'static str, start: Instant) {
    metrics::counter!("crowdfund_flow_total", "action" => action, "outcome" => outcome)
        .increment(1);
    metrics::histogram!("crowdfund_flow_duration_seconds", "action" => action)
        .record(start.elapsed().as_secs_f64());
}

/// Record a request served by one of the gateway proxy routes.
pub fn record_proxy_request(route: &'static str, status: u16) {
    metrics::counter!(
        "crowdfund_proxy_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a failed RPC endpoint attempt.
pub fn record_rpc_failover(method: &str) {
    metrics::counter!("crowdfund_rpc_failover_total", "method" => method.to_string())
        .increment(1);
}
