//! Retry policy shared by the async and blocking clients
//!
//! The policy decides what to do with the outcome of one attempt; the
//! client drivers own sending and sleeping. Retries are reserved for
//! transient conditions: network failures and 429 responses. Every other
//! error status is classified and returned on the first attempt.

use crate::config::ClientConfig;
use crate::errors::{Result, TransportError, VelixarError, classify};
use crate::transport::RawResponse;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Retry configuration for one client instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts per request (at least 1)
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `base_delay * 2^n`
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// What a driver should do after an attempt
#[derive(Debug)]
pub(crate) enum Step {
    /// Return this result to the caller
    Finish(Result<JsonValue>),
    /// Sleep for this long, then try again
    Retry {
        /// Delay before the next attempt
        delay: Duration,
        /// Short description for logging
        reason: String,
    },
}

impl RetryPolicy {
    /// Build the policy from a client config
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: config.backoff_base,
        }
    }

    /// Exponential backoff for a 0-based attempt index
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Decide the next step for the outcome of attempt `attempt` (0-based)
    pub(crate) fn evaluate(
        &self,
        attempt: u32,
        outcome: std::result::Result<RawResponse, TransportError>,
    ) -> Step {
        let response = match outcome {
            Ok(response) => response,
            Err(err) if err.is_transient() && self.has_attempts_left(attempt) => {
                return Step::Retry {
                    delay: self.backoff(attempt),
                    reason: err.to_string(),
                };
            },
            Err(err) => return Step::Finish(Err(VelixarError::connection(err))),
        };

        if response.status == 429 && self.has_attempts_left(attempt) {
            let delay = response
                .retry_after
                .map(Duration::from_secs)
                .unwrap_or_else(|| self.backoff(attempt));
            return Step::Retry {
                delay,
                reason: "rate limited".to_string(),
            };
        }

        if response.status >= 400 {
            return Step::Finish(Err(classify(
                response.status,
                response.retry_after,
                &response.body,
            )));
        }

        Step::Finish(response.json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    fn response(status: u16) -> RawResponse {
        RawResponse::new(status, b"{}".to_vec())
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = policy();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_success_decodes_body() {
        let outcome = Ok(RawResponse::new(200, br#"{"id": "mem-1"}"#.to_vec()));
        match policy().evaluate(0, outcome) {
            Step::Finish(Ok(value)) => assert_eq!(value, json!({"id": "mem-1"})),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_uses_exponential_backoff() {
        let policy = policy();
        match policy.evaluate(0, Ok(response(429))) {
            Step::Retry { delay, .. } => assert_eq!(delay, Duration::from_secs(1)),
            other => panic!("unexpected step: {other:?}"),
        }
        match policy.evaluate(1, Ok(response(429))) {
            Step::Retry { delay, .. } => assert_eq!(delay, Duration::from_secs(2)),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_prefers_retry_after() {
        let outcome = Ok(response(429).with_retry_after(Some(7)));
        match policy().evaluate(0, outcome) {
            Step::Retry { delay, .. } => assert_eq!(delay, Duration::from_secs(7)),
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_on_last_attempt_is_classified() {
        let outcome = Ok(response(429).with_retry_after(Some(3)));
        match policy().evaluate(2, outcome) {
            Step::Finish(Err(VelixarError::RateLimit { retry_after })) => {
                assert_eq!(retry_after, Some(3));
            },
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_client_errors_never_retry() {
        for status in [400, 401, 403, 404, 500, 503] {
            match policy().evaluate(0, Ok(response(status))) {
                Step::Finish(Err(err)) => assert_eq!(err.status_code(), Some(status)),
                other => panic!("unexpected step for {status}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_network_failure_retries_then_fails() {
        let policy = policy();
        let failure = || -> std::result::Result<RawResponse, TransportError> {
            Err(TransportError::Network("connection refused".into()))
        };

        match policy.evaluate(1, failure()) {
            Step::Retry { delay, .. } => assert_eq!(delay, Duration::from_secs(2)),
            other => panic!("unexpected step: {other:?}"),
        }
        match policy.evaluate(2, failure()) {
            Step::Finish(Err(VelixarError::Connection { source })) => {
                assert_eq!(source, TransportError::Network("connection refused".into()));
            },
            other => panic!("unexpected step: {other:?}"),
        }
    }

    #[test]
    fn test_request_failure_is_not_retried() {
        let outcome = Err(TransportError::Request("relative URL without a base".into()));
        assert!(matches!(
            policy().evaluate(0, outcome),
            Step::Finish(Err(VelixarError::Connection { .. }))
        ));
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_secs(1),
        };
        assert!(matches!(
            policy.evaluate(0, Ok(response(429))),
            Step::Finish(Err(VelixarError::RateLimit { .. }))
        ));
    }
}
