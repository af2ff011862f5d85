//! Retry logic with exponential backoff for remote calls
//!
//! Transport-level failures (timeouts, connection errors, throttling and
//! server-side status codes) are retried up to a fixed attempt ceiling;
//! everything else surfaces to the caller immediately.

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors that can classify themselves as worth retrying
pub trait Retryable {
    /// Whether a retry could plausibly succeed (throttling, transient
    /// transport failure) as opposed to a caller mistake (bad request,
    /// authentication failure)
    fn is_retryable(&self) -> bool;
}

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial retry interval
    pub initial_interval: Duration,
    /// Maximum retry interval
    pub max_interval: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom attempt ceiling
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the initial interval
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_multiplier(self.multiplier)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Execute a fallible future with retry
///
/// The operation is re-created on every attempt via the closure. Errors that
/// report `is_retryable() == false` short-circuit without further attempts.
pub async fn with_retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut backoff = policy.build_backoff();
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt, "operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() {
                    debug!(operation = operation_name, error = %e, "non-retryable error");
                    return Err(e);
                }

                if attempt >= policy.max_attempts {
                    warn!(
                        operation = operation_name,
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "attempt ceiling reached"
                    );
                    return Err(e);
                }

                let duration = backoff
                    .next_backoff()
                    .unwrap_or(policy.max_interval);
                warn!(
                    operation = operation_name,
                    attempt,
                    wait_ms = duration.as_millis() as u64,
                    error = %e,
                    "retrying after backoff"
                );
                tokio::time::sleep(duration).await;
            }
        }
    }
}
