//! Retry policy with exponential backoff for backend operations.

use std::time::Duration;

use crate::{Error, Result, TRACING_TARGET_RETRY};

/// Retry budget and backoff schedule for a store's backend calls.
///
/// The policy is pure orchestration: it decides *when* to retry, never
/// *whether* an error deserves one. That classification comes from the
/// predicate handed to [`run_classified`](Self::run_classified) — by default
/// the backend-supplied transient flag on [`Error`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first (0 is treated as 1).
    pub max_attempts: u32,
    /// Base wait between attempts.
    pub base_interval: Duration,
    /// Exponential backoff when true, a flat `base_interval` otherwise.
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_interval: Duration::from_millis(200),
            exponential: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom attempt budget.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Set the base wait between attempts.
    pub fn with_base_interval(mut self, base_interval: Duration) -> Self {
        self.base_interval = base_interval;
        self
    }

    /// Use a flat wait instead of exponential growth.
    pub fn linear(mut self) -> Self {
        self.exponential = false;
        self
    }

    /// Wait before the attempt that follows failed attempt `attempt` (0-indexed).
    fn backoff(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.base_interval;
        }
        let millis = (self.base_interval.as_millis() as u64)
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(millis)
    }

    /// Retry an operation, classifying errors by their backend-supplied flag.
    ///
    /// # Example
    /// ```ignore
    /// let policy = RetryPolicy::default();
    /// let item = policy.run(|| backend.get_item(request.clone())).await?;
    /// ```
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        self.run_classified(Error::is_retryable, operation).await
    }

    /// Retry an operation with a caller-supplied retryability predicate.
    ///
    /// The operation runs once; on success the value is returned with no
    /// further attempts. A failure the predicate rejects propagates unchanged
    /// after that single attempt. Otherwise the policy sleeps out its backoff
    /// and retries with identical input, surfacing the final attempt's error
    /// once the budget is spent.
    pub async fn run_classified<F, Fut, T, P>(
        &self,
        mut is_retryable: P,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
        P: FnMut(&Error) -> bool,
    {
        let budget = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..budget {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !is_retryable(&err) {
                        return Err(err);
                    }

                    if attempt + 1 < budget {
                        let backoff = self.backoff(attempt);
                        tracing::debug!(
                            target: TRACING_TARGET_RETRY,
                            attempt = attempt + 1,
                            budget = budget,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %err,
                            "Transient failure, retrying after backoff"
                        );
                        last_error = Some(err);
                        tokio::time::sleep(backoff).await;
                    } else {
                        tracing::debug!(
                            target: TRACING_TARGET_RETRY,
                            budget = budget,
                            error = %err,
                            "Retry budget exhausted"
                        );
                        last_error = Some(err);
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::backend(crate::BackendError::new("retry budget was empty"))))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::BackendError;

    fn policy() -> RetryPolicy {
        RetryPolicy::default().with_base_interval(Duration::from_millis(1))
    }

    #[test]
    fn default_budget_and_interval() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_interval, Duration::from_millis(200));
        assert!(policy.exponential);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(200));
        assert_eq!(policy.backoff(1), Duration::from_millis(400));
        assert_eq!(policy.backoff(2), Duration::from_millis(800));
    }

    #[test]
    fn linear_backoff_stays_flat() {
        let policy = RetryPolicy::default().linear();
        assert_eq!(policy.backoff(0), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(200));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(100).with_base_interval(Duration::from_millis(u64::MAX));
        assert_eq!(policy.backoff(70), Duration::from_millis(u64::MAX));
    }

    #[tokio::test]
    async fn success_on_first_attempt_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = policy()
            .run(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Error>(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = policy()
            .run(|| {
                let counter = counter.clone();
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt < 3 {
                        Err(Error::backend(BackendError::retryable("throttled")))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<u32> = policy()
            .run(|| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::backend(BackendError::new("access denied")))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_final_error_after_budget_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<u32> = policy()
            .run(|| {
                let counter = counter.clone();
                async move {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(Error::backend(BackendError::retryable(format!(
                        "throttled on attempt {attempt}"
                    ))))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(err.message(), "throttled on attempt 5");
    }

    #[tokio::test]
    async fn predicate_overrides_backend_flag() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        // Retryable per the backend, rejected by the caller's predicate.
        let result: Result<u32> = policy()
            .run_classified(
                |_| false,
                || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Err(Error::backend(BackendError::retryable("throttled")))
                    }
                },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
