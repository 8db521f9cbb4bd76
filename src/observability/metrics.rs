//! Metrics collection and exposition.
//!
//! # Metrics
//! - `resilience_attempts_total` (counter): attempts by outcome
//! - `resilience_retries_total` (counter): retries by triggering error kind
//! - `resilience_calls_total` / `resilience_call_duration_seconds`: per service, by outcome
//! - `resilience_circuit_transitions_total` (counter): per service, from/to
//! - `resilience_circuit_rejections_total` (counter): calls refused by an open circuit
//! - `resilience_circuit_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Returns false if the exporter could not be installed.
pub fn init_metrics(addr: SocketAddr) -> bool {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics exporter listening");
            true
        }
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
            false
        }
    }
}

pub fn record_attempt(outcome: &'static str) {
    counter!("resilience_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_retry(kind: &'static str) {
    counter!("resilience_retries_total", "error" => kind).increment(1);
}

pub fn record_call(service: &str, outcome: &'static str, start: Instant) {
    let service = service.to_string();
    counter!("resilience_calls_total", "service" => service.clone(), "outcome" => outcome).increment(1);
    histogram!("resilience_call_duration_seconds", "service" => service, "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_circuit_transition(service: &str, from: CircuitState, to: CircuitState) {
    counter!(
        "resilience_circuit_transitions_total",
        "service" => service.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    record_circuit_state(service, to);
}

pub fn record_circuit_state(service: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!("resilience_circuit_state", "service" => service.to_string()).set(value);
}

pub fn record_circuit_rejected(service: &str) {
    counter!("resilience_circuit_rejections_total", "service" => service.to_string()).increment(1);
}
