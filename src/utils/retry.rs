use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Bounded Exponential Backoff
// ============================================================================
//
// Retries a fallible async operation a fixed number of times, sleeping
// longer between attempts. Used for best-effort work (push delivery) where
// a couple of quick retries beat surfacing a transient hiccup.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Ceiling for the backoff.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Give up quickly. For best-effort side effects where latency matters
    /// more than the extra attempt.
    pub fn conservative() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let scaled = Duration::from_millis((current.as_millis() as f64 * self.multiplier) as u64);
        scaled.min(self.max_delay)
    }
}

/// Result of a retried operation.
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Some attempt succeeded.
    Success(T),
    /// Every attempt failed; carries the last error.
    Failed(E),
}

/// Run `operation` until it succeeds or the policy's attempt budget runs
/// out. The closure receives the 1-based attempt number.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: RetryPolicy, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = policy.initial_delay;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Operation recovered after retry");
                }
                return RetryResult::Success(value);
            }
            Err(error) => {
                if attempt >= policy.max_attempts {
                    tracing::error!(
                        attempt,
                        error = %error,
                        "Operation failed; retry budget exhausted"
                    );
                    return RetryResult::Failed(error);
                }

                tracing::warn!(
                    attempt,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed; retrying after delay"
                );

                sleep(delay).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}
