//! Retry with exponential backoff for transient HTTP failures
//!
//! Disabled unless `http.max_retries` is raised above zero: by default a
//! failed request fails the whole operation.

use crate::error::ReconcileResult;
use collink_common::config::HttpConfig;
use std::time::Duration;

/// Upper bound on a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How many times to retry and how long to wait first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
        }
    }

    pub fn from_config(http: &HttpConfig) -> Self {
        Self {
            max_retries: http.max_retries,
            initial_backoff: http.retry_initial_backoff(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Run `operation`, retrying transient errors per `policy`.
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. If the error is transient and retries remain: log WARN, back off, retry
/// 4. Otherwise return the error
///
/// Backoff doubles after each failed attempt, capped at 30 s.
pub async fn retry_transient<F, Fut, T>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> ReconcileResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ReconcileResult<T>>,
{
    let mut attempt: u32 = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Request succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                let retries_used = attempt - 1;
                if !err.is_transient() || retries_used >= policy.max_retries {
                    if attempt > 1 {
                        tracing::error!(
                            operation = operation_name,
                            attempt,
                            error = %err,
                            "Request failed after retries"
                        );
                    }
                    return Err(err);
                }

                let wait = backoff.min(MAX_BACKOFF);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = wait.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );

                tokio::time::sleep(wait).await;
                backoff = backoff.saturating_mul(2);
            }
        }
    }
}
