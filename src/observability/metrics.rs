//! Metrics collection and exposition.
//!
//! # Metrics
//! - `slow_monitor_requests_total` (counter): completed requests by outcome
//! - `slow_monitor_request_duration_seconds` (histogram): tracked request latency
//! - `slow_monitor_warnings_total` (counter): slow warnings published
//! - `slow_monitor_slow_network` (gauge): 1 while the warning is up
//!
//! Without an installed recorder every call here is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter and serve it on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count a completed request; `outcome` is "success" or "failure".
pub fn record_request_outcome(outcome: &'static str) {
    counter!("slow_monitor_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_request_duration(elapsed: Duration) {
    histogram!("slow_monitor_request_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_warning() {
    counter!("slow_monitor_warnings_total").increment(1);
}

pub fn set_slow_network(slow: bool) {
    gauge!("slow_monitor_slow_network").set(if slow { 1.0 } else { 0.0 });
}
