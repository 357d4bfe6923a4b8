//! Per-call timeout and retry policy for backend requests.

use audience_core::config::BackendConfig;
use audience_core::{AudienceError, AudienceResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RequestPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 1,
        }
    }
}

impl From<&BackendConfig> for RequestPolicy {
    fn from(config: &BackendConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            max_retries: config.max_retries,
        }
    }
}

impl RequestPolicy {
    /// Run `call`, bounding each attempt by the timeout and repeating it
    /// while the failure is retryable and attempts remain.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> AudienceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AudienceResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(AudienceError::Timeout(self.timeout.as_millis() as u64)),
            };
            match result {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(operation, attempt, error = %e, "Backend call failed, retrying");
                    metrics::counter!("store.backend.retries", "operation" => operation).increment(1);
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> RequestPolicy {
        RequestPolicy {
            timeout: Duration::from_millis(50),
            max_retries,
        }
    }

    #[tokio::test]
    async fn test_single_retry_recovers() {
        let calls = &AtomicU32::new(0);
        let result = policy(1)
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(AudienceError::Backend("connection reset".into()))
                } else {
                    Ok(7u64)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let calls = &AtomicU32::new(0);
        let result: AudienceResult<u64> = policy(1)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AudienceError::Backend("unavailable".into()))
            })
            .await;
        assert!(matches!(result, Err(AudienceError::Backend(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_final_errors_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: AudienceResult<u64> = policy(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AudienceError::Rejected {
                    status: 400,
                    message: "bad filter".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_reported() {
        let calls = &AtomicU32::new(0);
        let result: AudienceResult<u64> = policy(1)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            })
            .await;
        assert!(matches!(result, Err(AudienceError::Timeout(50))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
