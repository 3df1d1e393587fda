//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_cache_lookups_total` (counter): hits/misses by backend
//! - `gateway_cache_stores_total` (counter): accepted/rejected writes by backend
//! - `gateway_cache_backend_unavailable_total` (counter): degraded operations
//! - `gateway_cache_config_events_total` (counter): dispatcher outcomes
//! - `gateway_cache_backend_swaps_total` (counter): installs by backend kind
//! - `gateway_buffer_releases_total` (counter): buffers freed by reason
//! - `gateway_buffer_retained_bytes` (gauge): bytes held by open buffers

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    ::metrics::counter!("gateway_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(backend: &'static str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    ::metrics::counter!("gateway_cache_lookups_total", "backend" => backend, "result" => result)
        .increment(1);
}

pub fn record_cache_store(backend: &'static str, accepted: bool) {
    let result = if accepted { "accepted" } else { "rejected" };
    ::metrics::counter!("gateway_cache_stores_total", "backend" => backend, "result" => result)
        .increment(1);
}

pub fn record_backend_unavailable(backend: &'static str, op: &'static str) {
    ::metrics::counter!("gateway_cache_backend_unavailable_total", "backend" => backend, "op" => op)
        .increment(1);
}

pub fn record_config_event(outcome: &'static str) {
    ::metrics::counter!("gateway_cache_config_events_total", "outcome" => outcome).increment(1);
}

pub fn record_backend_swap(backend: &'static str) {
    ::metrics::counter!("gateway_cache_backend_swaps_total", "backend" => backend).increment(1);
}

pub fn record_buffer_retained(bytes: usize) {
    ::metrics::gauge!("gateway_buffer_retained_bytes").increment(bytes as f64);
}

pub fn record_buffer_released(reason: &'static str, bytes: usize) {
    ::metrics::counter!("gateway_buffer_releases_total", "reason" => reason).increment(1);
    ::metrics::gauge!("gateway_buffer_retained_bytes").decrement(bytes as f64);
}
