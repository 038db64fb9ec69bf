//! Retry with exponential backoff.
//!
//! Wraps flaky async operations (metadata resolution against a remote
//! service) in a bounded retry loop. The error from the final attempt is
//! returned as-is; retrying never rewraps or loses the failure.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Backoff multiplier applied between attempts.
const BACKOFF_FACTOR: f64 = 1.5;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries (not counting the initial attempt).
    pub max_retries: u32,
    /// Delay before the first retry; grows by 1.5x per attempt.
    pub base_delay: Duration,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given operation name and defaults.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay after the given 1-based attempt number fails.
    fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .mul_f64(BACKOFF_FACTOR.powi(attempt as i32 - 1))
    }
}

/// Execute an async operation with retries, notifying an observer before
/// each retry.
///
/// Runs up to `max_retries + 1` attempts. The observer receives the
/// error, the 1-based number of the attempt that just failed, and the
/// total attempt budget; it is not called after the final attempt. On
/// exhaustion the last error is returned unmodified.
pub async fn retry_with_observer<F, Fut, T, E, O>(
    policy: &RetryPolicy,
    mut observer: O,
    operation: F,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    O: FnMut(&E, u32, u32),
{
    let max_attempts = policy.max_retries + 1;
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                observer(&e, attempt, max_attempts);
                let delay = policy.delay_after(attempt);
                debug!(
                    operation = policy.operation_name.as_str(),
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Execute an async operation with retries and no observer.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_observer(policy, |_: &E, _, _| {}, operation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new("test")
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(1))
    }

    #[test]
    fn test_delay_progression() {
        let policy = RetryPolicy::new("test").with_base_delay(Duration::from_millis(100));

        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(150));
        assert_eq!(policy.delay_after(3), Duration::from_millis(225));
    }

    #[tokio::test]
    async fn test_immediate_success_skips_observer() {
        let calls = AtomicU32::new(0);
        let observed = AtomicU32::new(0);

        let result = retry_with_observer(
            &fast_policy(3),
            |_: &String, _, _| {
                observed.fetch_add(1, Ordering::SeqCst);
            },
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, String>(7) }
            },
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(observed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fails_k_times_then_succeeds() {
        let calls = AtomicU32::new(0);
        let observed = AtomicU32::new(0);

        let result = retry_with_observer(
            &fast_policy(3),
            |_: &&str, attempt, max_attempts| {
                observed.fetch_add(1, Ordering::SeqCst);
                assert!(attempt < max_attempts);
                assert_eq!(max_attempts, 4);
            },
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(observed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_original_error() {
        let calls = AtomicU32::new(0);
        let observed = AtomicU32::new(0);

        let result: Result<(), String> = retry_with_observer(
            &fast_policy(2),
            |_: &String, _, _| {
                observed.fetch_add(1, Ordering::SeqCst);
            },
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("boom".to_string()) }
            },
        )
        .await;

        assert_eq!(result, Err("boom".to_string()));
        // max_retries=2 means three attempts total
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // observer fires after each failed attempt except the last
        assert_eq!(observed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let calls = AtomicU32::new(0);

        let result: Result<(), &str> = retry(&fast_policy(0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("no luck") }
        })
        .await;

        assert_eq!(result, Err("no luck"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
