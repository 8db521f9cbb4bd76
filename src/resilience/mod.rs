//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call for a service:
//!     → registry.rs (look up or create the service's breaker)
//!     → circuit_breaker.rs (fail fast if open, probe if cooled down)
//!     → retries.rs (retry loop with backoff.rs delays)
//!         → timeouts.rs (deadline on each attempt)
//!         → operation (or fetch.rs for HTTP)
//!     → circuit_breaker.rs (final outcome updates breaker state)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Errors carry an explicit variant, so classification is a match, not a probe
//! - Circuit breaker prevents futile calls to a failing dependency

pub mod backoff;
pub mod circuit_breaker;
pub mod error;
pub mod fetch;
pub mod registry;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerPolicy, CircuitSnapshot, CircuitState};
pub use error::ResilienceError;
pub use fetch::fetch_with_retry;
pub use registry::{ResilienceOptions, ResilienceRegistry};
pub use retries::{run_with_retry, RetryExecutor, RetryPolicy};
