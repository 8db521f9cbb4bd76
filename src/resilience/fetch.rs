//! HTTP integration.
//!
//! # Responsibilities
//! - Send a `reqwest` request under a [`RetryPolicy`]
//! - Turn retryable non-2xx responses into [`ResilienceError::Status`]
//! - Hand every other response back untouched, error statuses included
//!
//! # Design Decisions
//! - Each attempt sends a clone of the request; streaming bodies are rejected up front
//! - The per-attempt timeout drops the in-flight request, aborting it
//! - Requests without their own timeout are sent with the per-attempt deadline

use reqwest::{Client, Request, Response};

use crate::resilience::error::ResilienceError;
use crate::resilience::retries::{run_with_retry, RetryPolicy};

/// Fail fast when `request` would need to be re-sent but cannot be cloned.
pub(crate) fn ensure_replayable(request: &Request, policy: &RetryPolicy) -> Result<(), ResilienceError> {
    if policy.max_retries > 0 && request.try_clone().is_none() {
        return Err(ResilienceError::BodyNotReplayable);
    }
    Ok(())
}

/// Send `request`, retrying per `policy`.
///
/// Only statuses in `policy.retryable_status_codes` become errors. A 404,
/// for instance, is returned as a normal response for the caller to inspect.
pub async fn fetch_with_retry(
    client: &Client,
    request: Request,
    policy: &RetryPolicy,
) -> Result<Response, ResilienceError> {
    ensure_replayable(&request, policy)?;

    let method = request.method().clone();
    let url = request.url().clone();
    tracing::debug!(method = %method, url = %url, "Fetching with retry");

    let mut pending = Some(request);
    run_with_retry(
        || {
            let next = match pending.as_ref().and_then(Request::try_clone) {
                Some(copy) => Some(copy),
                None => pending.take(),
            };
            async move {
                let request = next.ok_or(ResilienceError::BodyNotReplayable)?;
                send_once(client, request, policy).await
            }
        },
        policy,
    )
    .await
}

async fn send_once(
    client: &Client,
    mut request: Request,
    policy: &RetryPolicy,
) -> Result<Response, ResilienceError> {
    // An explicit request timeout also overrides any client-wide one.
    let deadline = *request.timeout_mut().get_or_insert(policy.per_attempt_timeout);
    let response = client
        .execute(request)
        .await
        .map_err(|e| ResilienceError::from_reqwest(e, deadline))?;
    let status = response.status();

    if !status.is_success() && policy.retries_status(status.as_u16()) {
        tracing::debug!(url = %response.url(), status = %status, "Retryable status received");
        return Err(ResilienceError::Status {
            status: status.as_u16(),
        });
    }

    Ok(response)
}
