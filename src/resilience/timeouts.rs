//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race one attempt against a deadline
//! - Map an elapsed deadline to [`ResilienceError::Timeout`]
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The losing future is dropped, which cancels in-flight work such as a reqwest request
//! - A late completion can never reach the caller once the deadline has won

use std::future::Future;
use std::time::Duration;

use crate::resilience::error::ResilienceError;

/// Run `attempt`, failing with `Timeout` if it does not settle within `limit`.
pub async fn with_timeout<T, Fut>(limit: Duration, attempt: Fut) -> Result<T, ResilienceError>
where
    Fut: Future<Output = Result<T, ResilienceError>>,
{
    match tokio::time::timeout(limit, attempt).await {
        Ok(outcome) => outcome,
        Err(_) => Err(ResilienceError::Timeout(limit)),
    }
}
