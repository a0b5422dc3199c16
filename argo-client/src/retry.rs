//! Bounded retry for idempotent reads
//!
//! Only failures to complete a request at all (connection refused or reset,
//! timeouts) are retried. A response with any status code, including 4xx and
//! 5xx, ends the loop: the server has seen the request and answered.

use std::time::Duration;

use argo_core::cancel::CancelToken;
use reqwest::{RequestBuilder, Response};
use tracing::{error, info, warn};

use crate::error::{ClientError, Result};

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one
    pub max_retries: u32,
    /// Delay between attempts
    pub wait: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, wait: Duration) -> Self {
        Self { max_retries, wait }
    }

    /// A policy that sends each request exactly once
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Total number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(2, Duration::from_secs(1))
    }
}

/// Sends a request built by `make_request`, retrying transport failures
///
/// `make_request` is called once per attempt since a `RequestBuilder` is
/// consumed by `send`.
pub(crate) async fn send_with_retry<F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    operation: &str,
    make_request: F,
) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            outcome = make_request().send() => outcome,
        };

        match outcome {
            Ok(response) => {
                if attempt > 1 {
                    info!("{} succeeded after {} attempt(s)", operation, attempt);
                }
                return Ok(response);
            }
            Err(e) if !e.is_builder() && attempt <= policy.max_retries => {
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    operation,
                    attempt,
                    policy.max_attempts(),
                    e
                );
                warn!("Retrying in {} ms...", policy.wait.as_millis());

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                    _ = tokio::time::sleep(policy.wait) => {}
                }
            }
            Err(e) => {
                error!(
                    "{} failed after {} attempt(s): {}",
                    operation, attempt, e
                );
                return Err(ClientError::Transport(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.wait, Duration::from_secs(1));
    }

    #[test]
    fn test_none_policy_single_attempt() {
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }
}
