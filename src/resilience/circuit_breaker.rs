//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing if dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: on the first call after reset_timeout
//! Half-Open → Closed: half_open_max_calls consecutive successes
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - One breaker per service name (see `registry.rs`)
//! - Fail fast in Open state; the operation is never invoked
//! - The Open → Half-Open check only runs inside `execute`, never on reads
//! - The lock is not held across the awaited operation, so concurrent calls
//!   may interleave between the admission check and the outcome update

use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::error::ResilienceError;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds for one breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerPolicy {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Time the circuit stays open before probing.
    pub reset_timeout: Duration,
    /// Consecutive half-open successes that close the circuit.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(60_000),
            half_open_max_calls: 3,
        }
    }
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub half_open_successes: u32,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    last_failure: Option<Instant>,
}

impl BreakerInner {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            half_open_successes: 0,
            last_failure: None,
        }
    }
}

/// Circuit breaker guarding one named dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: String,
    policy: CircuitBreakerPolicy,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, policy: CircuitBreakerPolicy) -> Self {
        let service = service.into();
        metrics::record_circuit_state(&service, CircuitState::Closed);
        Self {
            service,
            policy,
            inner: Mutex::new(BreakerInner::closed()),
        }
    }

    pub fn policy(&self) -> &CircuitBreakerPolicy {
        &self.policy
    }

    /// Current state. Never transitions the breaker.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Current state and counters. Never transitions the breaker.
    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            half_open_successes: inner.half_open_successes,
        }
    }

    /// Force the breaker back to Closed with zeroed counters.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let previous = inner.state;
        *inner = BreakerInner::closed();
        drop(inner);

        if previous != CircuitState::Closed {
            self.record_transition(previous, CircuitState::Closed);
        }
        tracing::info!(service = %self.service, "Circuit breaker reset");
    }

    /// Run `operation` if the circuit admits it, and account for its outcome.
    ///
    /// The operation's error is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, ResilienceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        self.try_acquire()?;

        let outcome = operation().await;
        match &outcome {
            Ok(_) => self.on_success(),
            Err(_) => self.on_failure(),
        }
        outcome
    }

    /// Admission check, including the Open → Half-Open probe transition.
    fn try_acquire(&self) -> Result<(), ResilienceError> {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return Ok(());
        }

        let cooled_down = inner
            .last_failure
            .map_or(true, |at| at.elapsed() >= self.policy.reset_timeout);
        if cooled_down {
            inner.state = CircuitState::HalfOpen;
            inner.half_open_successes = 0;
            drop(inner);
            self.record_transition(CircuitState::Open, CircuitState::HalfOpen);
            return Ok(());
        }

        drop(inner);
        tracing::debug!(service = %self.service, "Circuit open, rejecting call");
        metrics::record_circuit_rejected(&self.service);
        Err(ResilienceError::CircuitOpen {
            service: self.service.clone(),
        })
    }

    fn on_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.half_open_successes += 1;
                if inner.half_open_successes >= self.policy.half_open_max_calls {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.half_open_successes = 0;
                    drop(inner);
                    self.record_transition(CircuitState::HalfOpen, CircuitState::Closed);
                }
            }
            // A call admitted before the circuit opened; it says nothing about recovery.
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut inner = self.lock();
        inner.last_failure = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.policy.failure_threshold {
                    inner.state = CircuitState::Open;
                    drop(inner);
                    self.record_transition(CircuitState::Closed, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.half_open_successes = 0;
                drop(inner);
                self.record_transition(CircuitState::HalfOpen, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    fn record_transition(&self, from: CircuitState, to: CircuitState) {
        if to == CircuitState::Open {
            tracing::warn!(
                service = %self.service,
                from = %from,
                reset_timeout = ?self.policy.reset_timeout,
                "Circuit opened"
            );
        } else {
            tracing::info!(service = %self.service, from = %from, to = %to, "Circuit state changed");
        }
        metrics::record_circuit_transition(&self.service, from, to);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
