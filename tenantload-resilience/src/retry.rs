//! Retry policy and the transient-retry executor

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,

    /// Deadline applied to every individual attempt
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,

    /// Backoff step: the pause after failed attempt `n` is `n` steps long
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::transient_reads()
    }
}

impl RetryPolicy {
    /// Policy for idempotent read-path operations: 3 attempts, 60s per
    /// attempt, 500ms x attempt linear backoff.
    pub fn transient_reads() -> Self {
        Self::linear(3, Duration::from_millis(500)).with_attempt_timeout(Duration::from_secs(60))
    }

    /// Create a linear retry policy
    pub fn linear(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            attempt_timeout: Duration::from_secs(60),
            initial_delay: delay,
            max_delay: delay.saturating_mul(max_attempts.max(1)),
        }
    }

    /// Override the per-attempt deadline
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Linear delay after failed attempt number `attempt` (1-indexed), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(attempt)
            .min(self.max_delay)
    }
}

/// Trait for errors the executor can classify
pub trait Retryable {
    /// Whether this is a network/timeout class failure worth repeating
    fn is_transient(&self) -> bool;
}

/// An attempt ran past its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("attempt exceeded its {timeout:?} deadline")]
pub struct DeadlineExceeded {
    pub timeout: Duration,
}

/// Retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Create with the read-path policy
    pub fn with_default_policy() -> Self {
        Self::new(RetryPolicy::default())
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `f` until it succeeds, fails permanently, or the attempt budget runs out.
    ///
    /// Each attempt gets a fresh deadline of `attempt_timeout`; an attempt that
    /// overruns it fails with `E::from(DeadlineExceeded)`. Only transient failures
    /// are retried. `cancel` is observed while backing off between attempts, never
    /// during an attempt.
    pub async fn execute<F, Fut, T, E>(
        &self,
        cancel: &CancellationToken,
        mut f: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + From<DeadlineExceeded> + fmt::Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("Executing attempt {} of {}", attempt, max_attempts);

            let outcome = match timeout(self.policy.attempt_timeout, f(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(E::from(DeadlineExceeded {
                    timeout: self.policy.attempt_timeout,
                })),
            };

            let error = match outcome {
                Ok(result) => {
                    if attempt > 1 {
                        info!("Operation succeeded after {} attempts", attempt);
                    }
                    return Ok(result);
                }
                Err(error) => error,
            };

            if !error.is_transient() {
                warn!("Operation failed with non-retryable error: {}", error);
                return Err(RetryError::NonRetryableError(error));
            }

            if attempt >= max_attempts {
                warn!("Operation failed after {} attempts: {}", attempt, error);
                return Err(RetryError::MaxAttemptsExceeded {
                    attempts: attempt,
                    last_error: error,
                });
            }

            let delay = self.policy.delay_for_attempt(attempt);
            warn!(
                "Attempt {} failed: {}. Retrying in {:?}",
                attempt, error, delay
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Cancelled while backing off after attempt {}", attempt);
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                _ = sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

/// Retry error types
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Every attempt failed transiently
    #[error("Maximum retry attempts ({attempts}) exceeded. Last error: {last_error}")]
    MaxAttemptsExceeded { attempts: u32, last_error: E },

    /// Non-retryable error encountered
    #[error("Non-retryable error: {0}")]
    NonRetryableError(E),

    /// Cancellation fired while waiting to retry
    #[error("Cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    /// Get the underlying error if present
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::MaxAttemptsExceeded { last_error, .. } => Some(last_error),
            RetryError::NonRetryableError(error) => Some(error),
            RetryError::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    enum TestError {
        Network,
        Rejected,
        Deadline,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Network | TestError::Deadline)
        }
    }

    impl From<DeadlineExceeded> for TestError {
        fn from(_: DeadlineExceeded) -> Self {
            TestError::Deadline
        }
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::linear(attempts, Duration::from_millis(500))
            .with_attempt_timeout(Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_uses_every_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(policy(3));
        let started = tokio::time::Instant::now();

        let result: Result<(), RetryError<TestError>> = executor
            .execute(&CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Network) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(RetryError::MaxAttemptsExceeded {
                attempts: 3,
                last_error: TestError::Network
            })
        ));
        // 500ms after attempt 1, 1000ms after attempt 2, nothing after the last
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(policy(3));

        let result: Result<(), RetryError<TestError>> = executor
            .execute(&CancellationToken::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Rejected) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result,
            Err(RetryError::NonRetryableError(TestError::Rejected))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let executor = RetryExecutor::new(policy(3));

        let result = executor
            .execute(&CancellationToken::new(), |attempt| async move {
                if attempt < 3 {
                    Err(TestError::Network)
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_deadline_counts_as_transient() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(
            RetryPolicy::linear(2, Duration::from_millis(500))
                .with_attempt_timeout(Duration::from_secs(1)),
        );

        let result = executor
            .execute(&CancellationToken::new(), |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 1 {
                        sleep(Duration::from_secs(5)).await;
                    }
                    Ok::<_, TestError>("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff_aborts() {
        let calls = Arc::new(AtomicU32::new(0));
        let executor = RetryExecutor::new(policy(3));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let result: Result<(), RetryError<TestError>> = executor
            .execute(&cancel, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Network) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 1 })));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_transient_reads_policy() {
        let policy = RetryPolicy::transient_reads();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(60));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_grows_linearly_up_to_cap() {
        let policy = RetryPolicy::linear(4, Duration::from_millis(500));
        let delays: Vec<_> = (1..=6).map(|n| policy.delay_for_attempt(n)).collect();
        assert_eq!(
            delays,
            [500, 1000, 1500, 2000, 2000, 2000].map(Duration::from_millis)
        );
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn test_policy_from_yaml() {
        let yaml = "max_attempts: 3\nattempt_timeout: 60s\ninitial_delay: 500ms\nmax_delay: 1500ms\n";
        let policy: RetryPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy, RetryPolicy::transient_reads());
    }
}
