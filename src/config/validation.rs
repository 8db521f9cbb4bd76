//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds >= 1, timeouts > 0, status codes)
//! - Validate every per-service override the same way as the defaults
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResilienceConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::{CircuitBreakerConfig, ResilienceConfig, RetryConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{scope}: backoff_multiplier must be a finite number >= 1 (got {value})")]
    BackoffMultiplier { scope: String, value: f64 },

    #[error("{scope}: per_attempt_timeout_ms must be greater than 0")]
    ZeroTimeout { scope: String },

    #[error("{scope}: status code {code} is not a valid HTTP status")]
    StatusCode { scope: String, code: u16 },

    #[error("{scope}: failure_threshold must be at least 1")]
    FailureThreshold { scope: String },

    #[error("{scope}: half_open_max_calls must be at least 1")]
    HalfOpenMaxCalls { scope: String },

    #[error("observability: unknown log_format '{0}' (expected 'pretty' or 'json')")]
    LogFormat(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &ResilienceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_retry("retry", &config.retry, &mut errors);
    validate_breaker("circuit_breaker", &config.circuit_breaker, &mut errors);

    let mut names: Vec<&String> = config.services.keys().collect();
    names.sort();
    for name in names {
        let service = &config.services[name];
        if let Some(retry) = &service.retry {
            validate_retry(&format!("services.{}.retry", name), retry, &mut errors);
        }
        if let Some(breaker) = &service.circuit_breaker {
            validate_breaker(&format!("services.{}.circuit_breaker", name), breaker, &mut errors);
        }
    }

    match config.observability.log_format.as_str() {
        "pretty" | "json" => {}
        other => errors.push(ValidationError::LogFormat(other.to_string())),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_retry(scope: &str, retry: &RetryConfig, errors: &mut Vec<ValidationError>) {
    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        errors.push(ValidationError::BackoffMultiplier {
            scope: scope.to_string(),
            value: retry.backoff_multiplier,
        });
    }
    if retry.per_attempt_timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout { scope: scope.to_string() });
    }
    for &code in &retry.retryable_status_codes {
        if !(100..=599).contains(&code) {
            errors.push(ValidationError::StatusCode { scope: scope.to_string(), code });
        }
    }
}

fn validate_breaker(scope: &str, breaker: &CircuitBreakerConfig, errors: &mut Vec<ValidationError>) {
    if breaker.failure_threshold == 0 {
        errors.push(ValidationError::FailureThreshold { scope: scope.to_string() });
    }
    if breaker.half_open_max_calls == 0 {
        errors.push(ValidationError::HalfOpenMaxCalls { scope: scope.to_string() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceConfig;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&ResilienceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ResilienceConfig::default();
        config.retry.backoff_multiplier = 0.5;
        config.retry.per_attempt_timeout_ms = 0;
        config.retry.retryable_status_codes.push(42);
        config.circuit_breaker.failure_threshold = 0;
        config.observability.log_format = "xml".into();
        config.services.insert(
            "ledger".into(),
            ServiceConfig {
                retry: None,
                circuit_breaker: Some(CircuitBreakerConfig {
                    half_open_max_calls: 0,
                    ..CircuitBreakerConfig::default()
                }),
            },
        );

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&ValidationError::StatusCode { scope: "retry".into(), code: 42 }));
        assert!(errors.contains(&ValidationError::HalfOpenMaxCalls {
            scope: "services.ledger.circuit_breaker".into()
        }));
    }

    #[test]
    fn test_nan_multiplier_rejected() {
        let mut config = ResilienceConfig::default();
        config.retry.backoff_multiplier = f64::NAN;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::BackoffMultiplier { .. }));
    }
}
