//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_request_count_total` (counter): requests by method, path, code, host
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency by code
//! - `gateway_pending_requests` (gauge): in-flight requests per route
//! - `gateway_cold_starts_total` (counter): requests that waited for a backend
//! - `gateway_readiness_timeouts_total` (counter): readiness waits that gave up
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op
//! - The exporter serves its own scrape endpoint

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, path: &str, code: u16, host: &str, start: Instant) {
    ::metrics::counter!(
        "gateway_request_count_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "code" => code.to_string(),
        "host" => host.to_string()
    )
    .increment(1);
    ::metrics::histogram!(
        "gateway_request_duration_seconds",
        "code" => code.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_pending(route_key: &str, pending: i64) {
    ::metrics::gauge!("gateway_pending_requests", "route" => route_key.to_string())
        .set(pending as f64);
}

pub fn record_cold_start(route_key: &str, failover: bool) {
    ::metrics::counter!(
        "gateway_cold_starts_total",
        "route" => route_key.to_string(),
        "failover" => failover.to_string()
    )
    .increment(1);
}

pub fn record_readiness_timeout(route_key: &str) {
    ::metrics::counter!("gateway_readiness_timeouts_total", "route" => route_key.to_string())
        .increment(1);
}
