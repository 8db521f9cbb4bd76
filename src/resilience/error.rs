//! Error taxonomy for resilient calls.

use std::time::Duration;
use thiserror::Error;

/// Boxed error type carried by [`ResilienceError::Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced or propagated by the resilience layer.
#[derive(Debug, Error)]
pub enum ResilienceError {
    /// An attempt did not finish within the per-attempt timeout.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The dependency answered with a non-2xx status.
    #[error("request failed with status {status}")]
    Status { status: u16 },

    /// Any other failure of the operation (network, decoding, ...).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The circuit for `service` is open; the operation was not invoked.
    #[error("circuit open for service '{service}'")]
    CircuitOpen { service: String },

    /// The request body is a stream and cannot be sent more than once.
    #[error("request body cannot be replayed for retries")]
    BodyNotReplayable,
}

impl ResilienceError {
    /// Wrap an arbitrary error as a transport failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        ResilienceError::Transport(err.into())
    }

    /// Status code carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ResilienceError::Status { status } => Some(*status),
            _ => None,
        }
    }

    /// True for the synthetic error raised by an open breaker.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Short label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            ResilienceError::Timeout(_) => "timeout",
            ResilienceError::Status { .. } => "status",
            ResilienceError::Transport(_) => "transport",
            ResilienceError::CircuitOpen { .. } => "circuit_open",
            ResilienceError::BodyNotReplayable => "body_not_replayable",
        }
    }

    /// Map a reqwest failure; `deadline` is the timeout the request was sent with.
    pub fn from_reqwest(err: reqwest::Error, deadline: Duration) -> Self {
        if err.is_timeout() {
            ResilienceError::Timeout(deadline)
        } else {
            ResilienceError::Transport(Box::new(err))
        }
    }
}
