//! Retry Policy
//!
//! One bounded, linear-backoff retry loop shared by the connectivity probe
//! and the query facade. Backoff sleeps suspend only the calling task.

use std::future::Future;
use std::time::Duration;

/// Bounded retry with linear backoff
///
/// The delay after failed attempt `n` (1-based) is
/// `first_delay + step * (n - 1)`. No delay follows the final attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    first_delay: Duration,
    step: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one
    pub const fn linear(max_attempts: u32, first_delay: Duration, step: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            first_delay,
            step,
        }
    }

    /// Connectivity probe: 3 attempts, waiting 2 then 4 units
    pub fn probe(unit: Duration) -> Self {
        Self::linear(3, unit * 2, unit * 2)
    }

    /// Query facade: 2 attempts, waiting 1 unit × attempt index
    pub fn query(unit: Duration) -> Self {
        Self::linear(2, unit, unit)
    }

    /// Single attempt, never retried
    pub const fn none() -> Self {
        Self::linear(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.first_delay + self.step * attempt.saturating_sub(1)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. The last error is returned unchanged.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut, C>(&self, is_retryable: C, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && is_retryable(&err) => {
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying after retryable failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum Failure {
        Flaky(u32),
        Fatal,
    }

    impl std::fmt::Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn flaky(err: &Failure) -> bool {
        matches!(err, Failure::Flaky(_))
    }

    #[test]
    fn test_probe_schedule() {
        let policy = RetryPolicy::probe(Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[test]
    fn test_query_schedule() {
        let policy = RetryPolicy::query(Duration::from_millis(100));
        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(
            RetryPolicy::linear(0, Duration::ZERO, Duration::ZERO).max_attempts(),
            1
        );
    }

    #[tokio::test]
    async fn test_succeeds_after_retry() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(3, Duration::from_millis(1), Duration::ZERO);

        let result = policy
            .run(flaky, |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(Failure::Flaky(attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_budget_spent() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(2, Duration::from_millis(1), Duration::ZERO);

        let result: Result<(), _> = policy
            .run(flaky, |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(Failure::Flaky(attempt)) }
            })
            .await;

        assert_eq!(result, Err(Failure::Flaky(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::linear(5, Duration::from_millis(1), Duration::ZERO);

        let result: Result<(), _> = policy
            .run(flaky, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Failure::Fatal) }
            })
            .await;

        assert_eq!(result, Err(Failure::Fatal));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backoff_is_linear() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(20), Duration::from_millis(20));
        let started = tokio::time::Instant::now();

        let _: Result<(), _> = policy
            .run(flaky, |attempt| async move { Err(Failure::Flaky(attempt)) })
            .await;

        // 20ms + 40ms of backoff
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
