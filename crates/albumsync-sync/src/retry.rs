//! Retry discipline for transient remote errors
//!
//! Rate-limit, timeout, network and 5xx failures are retried with a fixed
//! delay, the same attempts/delay shape the index waiter uses. Everything
//! else is returned to the caller on the first failure.

use std::time::Duration;

use albumsync_core::config::RetryConfig;
use albumsync_core::domain::errors::RemoteError;
use tracing::{info, warn};

/// How many times, and how far apart, a remote call is tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// A single attempt, no retries
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.attempts, Duration::from_secs(config.delay_secs))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Executes an async remote call, retrying transient failures
///
/// Non-transient errors are returned immediately.
pub async fn with_retry<F, Fut, T>(
    policy: RetryPolicy,
    operation_name: &str,
    f: F,
) -> Result<T, RemoteError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, RemoteError>>,
{
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(
                        operation = operation_name,
                        attempt, "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < policy.attempts => {
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_secs = policy.delay.as_secs(),
                    error = %err,
                    "Transient error, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
