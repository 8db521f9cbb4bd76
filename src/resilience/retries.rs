//! Retry logic.
//!
//! # Responsibilities
//! - Classify failures as retryable or not
//! - Execute retries with exponential backoff
//! - Bound every attempt with the per-attempt timeout
//!
//! # Design Decisions
//! - Errors without a status code (transport, timeout) are always retryable,
//!   including errors raised by the operation's own logic
//! - Status errors are retryable only when listed in `retryable_status_codes`
//! - The last error is returned unchanged once attempts are exhausted
//! - No state survives between two `run` calls

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use crate::observability::metrics;
use crate::resilience::backoff::Backoff;
use crate::resilience::error::ResilienceError;
use crate::resilience::timeouts::with_timeout;

/// Status codes retried by default.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Retry behaviour for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt. Zero means a single attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Factor applied to the delay after each retry (>= 1).
    pub backoff_multiplier: f64,
    /// Status codes that qualify a failed response for retry.
    pub retryable_status_codes: BTreeSet<u16>,
    /// Deadline for every single attempt.
    pub per_attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
            per_attempt_timeout: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    /// True if `status` is in the retryable set.
    pub fn retries_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }
}

/// Decide whether `err` may be retried under `policy`.
///
/// Attempt accounting is left to the caller.
pub fn is_retryable(err: &ResilienceError, policy: &RetryPolicy) -> bool {
    match err {
        ResilienceError::Status { status } => policy.retries_status(*status),
        ResilienceError::Timeout(_) | ResilienceError::Transport(_) => true,
        ResilienceError::CircuitOpen { .. } | ResilienceError::BodyNotReplayable => false,
    }
}

/// Runs operations under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Execute `operation` until it succeeds, fails non-retryably, or
    /// `max_retries` retries have been spent.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        let policy = &self.policy;
        let mut backoff = Backoff::new(policy.initial_delay, policy.backoff_multiplier);
        let mut attempt: u32 = 0;

        loop {
            match with_timeout(policy.per_attempt_timeout, operation()).await {
                Ok(value) => {
                    metrics::record_attempt("success");
                    return Ok(value);
                }
                Err(err) => {
                    metrics::record_attempt(err.kind());

                    if attempt >= policy.max_retries || !is_retryable(&err, policy) {
                        tracing::debug!(
                            attempt = attempt + 1,
                            error = %err,
                            "Giving up on operation"
                        );
                        return Err(err);
                    }

                    let delay = backoff.next_delay();
                    tracing::info!(
                        attempt = attempt + 1,
                        delay = ?delay,
                        error = %err,
                        "Retrying operation"
                    );
                    metrics::record_retry(err.kind());
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Run `operation` under `policy`.
pub async fn run_with_retry<T, F, Fut>(operation: F, policy: &RetryPolicy) -> Result<T, ResilienceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ResilienceError>>,
{
    RetryExecutor::new(policy.clone()).run(operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            per_attempt_timeout: Duration::from_millis(500),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.per_attempt_timeout, Duration::from_secs(30));
        for code in [408, 429, 500, 502, 503, 504] {
            assert!(policy.retries_status(code));
        }
        assert!(!policy.retries_status(404));
    }

    #[test]
    fn test_classification() {
        let policy = RetryPolicy::default();
        assert!(is_retryable(&ResilienceError::Status { status: 503 }, &policy));
        assert!(!is_retryable(&ResilienceError::Status { status: 400 }, &policy));
        assert!(is_retryable(&ResilienceError::Timeout(Duration::from_secs(1)), &policy));
        assert!(is_retryable(&ResilienceError::transport("connection reset"), &policy));
        assert!(!is_retryable(&ResilienceError::CircuitOpen { service: "s".into() }, &policy));
        assert!(!is_retryable(&ResilienceError::BodyNotReplayable, &policy));
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = run_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, ResilienceError>(42) }
            },
            &fast_policy(3),
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permanent_retryable_failure_uses_every_attempt() {
        for n in [0u32, 1, 3] {
            let calls = AtomicU32::new(0);
            let result: Result<(), _> = run_with_retry(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(ResilienceError::Status { status: 503 }) }
                },
                &fast_policy(n),
            )
            .await;

            assert_eq!(result.unwrap_err().status_code(), Some(503));
            assert_eq!(calls.load(Ordering::SeqCst), n + 1, "max_retries = {}", n);
        }
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_after_one_call() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ResilienceError::Status { status: 404 }) }
            },
            &fast_policy(5),
        )
        .await;

        assert_eq!(result.unwrap_err().status_code(), Some(404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = run_with_retry(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ResilienceError::transport("connection refused"))
                    } else {
                        Ok("ok")
                    }
                }
            },
            &fast_policy(3),
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_backoff_delays_compound() {
        let stamps = Arc::new(Mutex::new(Vec::new()));
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(40),
            backoff_multiplier: 2.0,
            ..RetryPolicy::default()
        };

        let result: Result<(), _> = run_with_retry(
            || {
                stamps.lock().unwrap().push(Instant::now());
                async { Err(ResilienceError::transport("down")) }
            },
            &policy,
        )
        .await;
        assert!(result.is_err());

        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps.len(), 4);
        let expected = [40u64, 80, 160];
        for (k, window) in stamps.windows(2).enumerate() {
            let gap = window[1].duration_since(window[0]);
            assert!(
                gap >= Duration::from_millis(expected[k]),
                "retry {} waited {:?}, expected at least {}ms",
                k,
                gap,
                expected[k]
            );
            assert!(gap < Duration::from_millis(expected[k] + 500));
        }
    }

    #[tokio::test]
    async fn test_timeout_counts_as_retryable_failure() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            per_attempt_timeout: Duration::from_millis(20),
            ..RetryPolicy::default()
        };

        let result: Result<(), _> = run_with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                }
            },
            &policy,
        )
        .await;

        assert!(matches!(result, Err(ResilienceError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_still_enforces_timeout_without_waiting() {
        let policy = RetryPolicy {
            max_retries: 0,
            initial_delay: Duration::from_secs(10),
            per_attempt_timeout: Duration::from_millis(20),
            ..RetryPolicy::default()
        };

        let start = Instant::now();
        let result: Result<(), _> = run_with_retry(
            || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            &policy,
        )
        .await;

        assert!(matches!(result, Err(ResilienceError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
