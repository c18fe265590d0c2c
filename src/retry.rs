//! Retry with exponential backoff.
//!
//! One helper shared by every remote call. The caller decides which errors
//! are transient; everything else is returned on the spot.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Bounded retry schedule: `max_attempts` tries, doubling the delay after
/// each failure starting from `base_delay`, never sleeping longer than
/// `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Sum of all sleeps when every attempt fails.
    pub fn total_backoff(&self) -> Duration {
        (1..self.max_attempts).map(|a| self.delay_for(a)).sum()
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy runs out of attempts. The closure receives the 1-based attempt
/// number. The last error is returned unchanged.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if attempt > 1 {
            debug!(operation = operation_name, attempt, "Retrying operation");
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) {
                    debug!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Non-retryable failure"
                    );
                    return Err(err);
                }

                if attempt >= max_attempts {
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Giving up: retry budget exhausted"
                    );
                    return Err(err);
                }

                let delay = policy.delay_for(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, will retry after backoff"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[test]
    fn test_delay_doubles_from_base() {
        let policy = RetryPolicy::new(4, Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy =
            RetryPolicy::new(10, Duration::from_secs(1)).with_max_delay(Duration::from_secs(5));
        assert_eq!(policy.delay_for(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for(40), Duration::from_secs(5));
    }

    #[test]
    fn test_total_backoff_for_default_policy() {
        // 3 attempts, 2 sleeps: 1s + 2s
        assert_eq!(RetryPolicy::default().total_backoff(), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_first_attempt_without_sleeping() {
        let start = Instant::now();
        let result: Result<i32, String> =
            retry_with_backoff(&RetryPolicy::default(), "test_op", |_| true, |_| async {
                Ok(42)
            })
            .await;
        assert_eq!(result, Ok(42));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = Cell::new(0);
        let result: Result<&str, String> =
            retry_with_backoff(&RetryPolicy::default(), "test_op", |_| true, |attempt| {
                calls.set(calls.get() + 1);
                async move {
                    if attempt < 3 {
                        Err(format!("failure {}", attempt))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_returns_last_error_after_backoff() {
        let start = Instant::now();
        let result: Result<(), String> =
            retry_with_backoff(&RetryPolicy::default(), "test_op", |_| true, |attempt| async move {
                Err(format!("failure {}", attempt))
            })
            .await;
        assert_eq!(result, Err("failure 3".to_string()));
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = Cell::new(0);
        let start = Instant::now();
        let result: Result<(), String> = retry_with_backoff(
            &RetryPolicy::default(),
            "test_op",
            |e: &String| !e.starts_with("fatal"),
            |_| {
                calls.set(calls.get() + 1);
                async { Err("fatal: unauthorized".to_string()) }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
