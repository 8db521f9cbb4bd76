//! Retry and circuit breaker layer for ImpactSoluce service calls.

pub mod config;
pub mod observability;
pub mod resilience;

pub use config::schema::ResilienceConfig;
pub use resilience::{
    fetch_with_retry, run_with_retry, CircuitBreaker, CircuitBreakerPolicy, CircuitState, ResilienceError,
    ResilienceOptions, ResilienceRegistry, RetryPolicy,
};
