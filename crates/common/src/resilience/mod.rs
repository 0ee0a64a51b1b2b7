//! Timeout and retry wrapper for external provider calls
//!
//! Every completion and search request goes through [`call_with_retry`]:
//! each attempt is bounded by a timeout, and only transient failures
//! (timeouts, connection errors, HTTP 429/5xx) are retried.

use crate::errors::{AppError, Result};
use std::future::Future;
use std::time::Duration;

/// Retry policy for one provider
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Provider name used in errors and logs
    pub provider: String,

    /// Upper bound for a single attempt
    pub timeout: Duration,

    /// Extra attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry; doubles per attempt
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(provider: impl Into<String>, timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            provider: provider.into(),
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
            base_delay: Duration::from_millis(200),
        }
    }
}

/// Run `op` under the policy's timeout, retrying transient failures
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        let outcome = match tokio::time::timeout(policy.timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::ProviderTimeout {
                provider: policy.provider.clone(),
                timeout_ms: policy.timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(
                    provider = %policy.provider,
                    attempt = attempt,
                    max_retries = policy.max_retries,
                    error = %e,
                    "Provider call failed, retrying"
                );
                let delay = policy.base_delay * 2_u32.pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            provider: "test".to_string(),
            timeout: Duration::from_millis(50),
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let calls = AtomicU32::new(0);
        let result = call_with_retry(&fast_policy(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(AppError::UpstreamStatus {
                        provider: "test".into(),
                        status: 503,
                        body: String::new(),
                    })
                } else {
                    Ok("recovered")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = call_with_retry(&fast_policy(1), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AppError::UpstreamStatus {
                    provider: "test".into(),
                    status: 500,
                    body: String::new(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = call_with_retry(&fast_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(AppError::ProviderFailure {
                    provider: "test".into(),
                    message: "bad request".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let result: Result<()> = call_with_retry(&fast_policy(0), || async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::ProviderTimeout { .. })));
    }
}
