//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): dispatches by class, outcome
//! - `dispatch_duration_seconds` (histogram): end-to-end dispatch latency
//! - `dispatch_attempts_total` (counter): downstream attempts by pool, outcome
//! - `dispatch_rate_limited_total` (counter): token waits that hit the deadline
//! - `pool_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `pool_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `pool_fail_open_resets_total` (counter): exclusion sets cleared
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed, so none of these calls can fail a dispatch.

use std::net::SocketAddr;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::time::Instant;

use crate::config::ServiceClass;
use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_dispatch(class: ServiceClass, outcome: &'static str, start: Instant) {
    counter!("dispatch_requests_total", "class" => class.as_str(), "outcome" => outcome).increment(1);
    histogram!("dispatch_duration_seconds", "class" => class.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_attempt(pool: &str, outcome: &'static str) {
    counter!("dispatch_attempts_total", "pool" => pool.to_string(), "outcome" => outcome).increment(1);
}

pub fn record_rate_limited(pool: &str) {
    counter!("dispatch_rate_limited_total", "pool" => pool.to_string()).increment(1);
}

pub fn record_breaker_state(pool: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("pool_breaker_state", "pool" => pool.to_string()).set(value);
}

pub fn record_pool_health(pool: &str, healthy: bool) {
    gauge!("pool_healthy", "pool" => pool.to_string()).set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_fail_open(class: ServiceClass) {
    counter!("pool_fail_open_resets_total", "class" => class.as_str()).increment(1);
}
