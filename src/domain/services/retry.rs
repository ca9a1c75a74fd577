use std::time::Duration;

use crate::domain::models::{retcode, OperationStatus};

/// Bounded exponential backoff + non-retryable error classification (§4.5).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay before attempt `k` (1-based): `min(base_delay * 2^(k-1), max_delay)` (inv. 7).
    pub fn delay_for_attempt(&self, k: u32) -> Duration {
        let factor = 2u32.saturating_pow(k.saturating_sub(1));
        let scaled = self.base_delay.saturating_mul(factor);
        scaled.min(self.max_delay)
    }

    pub fn is_retryable(&self, retcode: i32) -> bool {
        retcode::is_retryable(retcode)
    }
}

/// Outcome of a single attempt at the wrapped operation, as reported by the caller.
pub enum AttemptOutcome {
    Done,
    Retcode(i32),
    TransportError(String),
}

/// Terminal result of `execute_with_retry`.
pub struct RetryResult {
    pub status: OperationStatus,
    pub attempts: u32,
    pub error_message: Option<String>,
}

/// Runs `operation` up to `policy.max_attempts` times, sleeping the exponential backoff delay
/// between retryable failures, and returns a terminal `RetryResult` — PENDING/PROCESSING states are
/// implicit in the loop, only the terminal COMPLETED/FAILED transition is observable here, matching
/// the state machine in §4.5 with callbacks invoked exactly once on the terminal transition.
pub async fn execute_with_retry<F, Fut>(policy: RetryPolicy, mut operation: F) -> RetryResult
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = AttemptOutcome>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;
        match operation(attempts).await {
            AttemptOutcome::Done => {
                return RetryResult {
                    status: OperationStatus::Completed,
                    attempts,
                    error_message: None,
                }
            }
            AttemptOutcome::Retcode(code) if !policy.is_retryable(code) => {
                return RetryResult {
                    status: OperationStatus::Failed,
                    attempts,
                    error_message: Some(format!("non-retryable retcode {code}")),
                }
            }
            AttemptOutcome::Retcode(code) => {
                if attempts >= policy.max_attempts {
                    return RetryResult {
                        status: OperationStatus::Failed,
                        attempts,
                        error_message: Some(format!("retryable retcode {code} exhausted retries")),
                    };
                }
                tokio::time::sleep(policy.delay_for_attempt(attempts)).await;
            }
            AttemptOutcome::TransportError(err) => {
                if attempts >= policy.max_attempts {
                    return RetryResult {
                        status: OperationStatus::Failed,
                        attempts,
                        error_message: Some(err),
                    };
                }
                tokio::time::sleep(policy.delay_for_attempt(attempts)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_grows_exponentially_and_caps_at_max_delay() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(6), Duration::from_secs(30));
    }

    // === invariant 6: a non-retryable retcode never triggers a second attempt ===
    #[tokio::test]
    async fn non_retryable_retcode_stops_after_one_attempt() {
        let calls = AtomicU32::new(0);
        let result = execute_with_retry(RetryPolicy::default(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { AttemptOutcome::Retcode(retcode::NO_MONEY) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.attempts, 1);
        assert!(matches!(result.status, OperationStatus::Failed));
    }

    #[tokio::test]
    async fn retryable_retcode_eventually_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(5));
        let result = execute_with_retry(policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    AttemptOutcome::Retcode(retcode::MARKET_CLOSED)
                } else {
                    AttemptOutcome::Done
                }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(result.status, OperationStatus::Completed));
    }

    #[tokio::test]
    async fn retryable_failure_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2));
        let result = execute_with_retry(policy, |_| async {
            AttemptOutcome::Retcode(retcode::CONNECTION)
        })
        .await;

        assert_eq!(result.attempts, 3);
        assert!(matches!(result.status, OperationStatus::Failed));
    }
}
