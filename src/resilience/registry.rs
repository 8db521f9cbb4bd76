//! Per-service circuit breaker registry.
//!
//! # Responsibilities
//! - Hand out one shared breaker per service name, created lazily
//! - Resolve retry and breaker policies for a call
//! - Compose breaker around retry executor
//!
//! # Design Decisions
//! - An explicit object injected into call sites, not a global
//! - The first policy seen for a service wins; later mismatches are logged, not applied
//! - A whole retry sequence is one call from the breaker's point of view

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use reqwest::{Client, Request, Response};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ResilienceConfig;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerPolicy, CircuitSnapshot, CircuitState};
use crate::resilience::error::ResilienceError;
use crate::resilience::fetch::{ensure_replayable, fetch_with_retry};
use crate::resilience::retries::{RetryExecutor, RetryPolicy};

/// Optional per-call policy overrides.
#[derive(Debug, Clone, Default)]
pub struct ResilienceOptions {
    pub retry: Option<RetryPolicy>,
    pub breaker: Option<CircuitBreakerPolicy>,
}

impl ResilienceOptions {
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn with_breaker(mut self, policy: CircuitBreakerPolicy) -> Self {
        self.breaker = Some(policy);
        self
    }
}

#[derive(Debug, Clone, Default)]
struct ServiceOverrides {
    retry: Option<RetryPolicy>,
    breaker: Option<CircuitBreakerPolicy>,
}

/// Shared map from service name to circuit breaker.
#[derive(Debug, Default)]
pub struct ResilienceRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_retry: RetryPolicy,
    default_breaker: CircuitBreakerPolicy,
    overrides: HashMap<String, ServiceOverrides>,
}

impl ResilienceRegistry {
    /// Registry with built-in default policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry using the configured defaults and per-service overrides.
    pub fn from_config(config: &ResilienceConfig) -> Self {
        let overrides = config
            .services
            .iter()
            .map(|(name, service)| {
                let entry = ServiceOverrides {
                    retry: service.retry.as_ref().map(RetryPolicy::from),
                    breaker: service.circuit_breaker.as_ref().map(CircuitBreakerPolicy::from),
                };
                (name.clone(), entry)
            })
            .collect();

        Self {
            breakers: DashMap::new(),
            default_retry: RetryPolicy::from(&config.retry),
            default_breaker: CircuitBreakerPolicy::from(&config.circuit_breaker),
            overrides,
        }
    }

    /// Retry policy used for `service` when the call supplies none.
    pub fn retry_policy_for(&self, service: &str) -> RetryPolicy {
        self.overrides
            .get(service)
            .and_then(|o| o.retry.clone())
            .unwrap_or_else(|| self.default_retry.clone())
    }

    /// Breaker policy a new breaker for `service` gets when the call supplies none.
    pub fn breaker_policy_for(&self, service: &str) -> CircuitBreakerPolicy {
        self.overrides
            .get(service)
            .and_then(|o| o.breaker.clone())
            .unwrap_or_else(|| self.default_breaker.clone())
    }

    /// Fetch or lazily create the breaker for `service`.
    pub fn circuit_breaker(&self, service: &str, policy: Option<&CircuitBreakerPolicy>) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(service) {
            let breaker = existing.value().clone();
            drop(existing);
            if let Some(requested) = policy {
                if requested != breaker.policy() {
                    tracing::warn!(
                        service = %service,
                        requested = ?requested,
                        active = ?breaker.policy(),
                        "Ignoring breaker policy for already registered service"
                    );
                }
            }
            return breaker;
        }

        let policy = policy
            .cloned()
            .unwrap_or_else(|| self.breaker_policy_for(service));
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| {
                tracing::debug!(service = %service, policy = ?policy, "Registering circuit breaker");
                Arc::new(CircuitBreaker::new(service, policy))
            })
            .value()
            .clone()
    }

    /// Run `operation` for `service` behind its breaker and the retry executor.
    pub async fn execute_with_resilience<T, F, Fut>(
        &self,
        service: &str,
        operation: F,
        options: &ResilienceOptions,
    ) -> Result<T, ResilienceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ResilienceError>>,
    {
        let breaker = self.circuit_breaker(service, options.breaker.as_ref());
        let retry = options
            .retry
            .clone()
            .unwrap_or_else(|| self.retry_policy_for(service));
        let executor = RetryExecutor::new(retry);

        let call_id = Uuid::new_v4();
        let span = tracing::debug_span!("resilient_call", service = %service, call_id = %call_id);
        let start = Instant::now();
        let outcome = breaker
            .execute(|| executor.run(operation))
            .instrument(span)
            .await;

        metrics::record_call(service, outcome_label(&outcome), start);
        outcome
    }

    /// Send `request` for `service` behind its breaker and `fetch_with_retry`.
    ///
    /// Non-retryable error statuses come back as `Ok` and count as breaker successes.
    pub async fn fetch_with_resilience(
        &self,
        service: &str,
        client: &Client,
        request: Request,
        options: &ResilienceOptions,
    ) -> Result<Response, ResilienceError> {
        let retry = options
            .retry
            .clone()
            .unwrap_or_else(|| self.retry_policy_for(service));
        ensure_replayable(&request, &retry)?;

        let breaker = self.circuit_breaker(service, options.breaker.as_ref());
        let call_id = Uuid::new_v4();
        let span = tracing::debug_span!(
            "resilient_fetch",
            service = %service,
            call_id = %call_id,
            url = %request.url()
        );
        let start = Instant::now();
        let outcome = breaker
            .execute(|| fetch_with_retry(client, request, &retry))
            .instrument(span)
            .await;

        metrics::record_call(service, outcome_label(&outcome), start);
        outcome
    }

    /// Force the breaker for `service` back to Closed. Returns false if unknown.
    pub fn reset_circuit_breaker(&self, service: &str) -> bool {
        match self.breakers.get(service) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// State of the breaker for `service`, or `None` if it was never used.
    pub fn circuit_breaker_status(&self, service: &str) -> Option<CircuitState> {
        self.breakers.get(service).map(|b| b.state())
    }

    /// Registered service names, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot of every registered breaker, sorted by service name.
    pub fn snapshot_all(&self) -> Vec<(String, CircuitSnapshot)> {
        let mut all: Vec<(String, CircuitSnapshot)> = self
            .breakers
            .iter()
            .map(|r| (r.key().clone(), r.value().snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

fn outcome_label<T>(outcome: &Result<T, ResilienceError>) -> &'static str {
    match outcome {
        Ok(_) => "success",
        Err(e) => e.kind(),
    }
}
