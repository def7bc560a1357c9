use std::sync::Mutex;
use std::time::{Duration, Instant};

// ============================================================================
// Circuit Breaker Pattern Implementation
// ============================================================================
//
// Shields callers from a misbehaving downstream by failing fast once it has
// proven unhealthy.
//
// States:
// - Closed: normal operation, calls pass through
// - Open: too many consecutive failures, calls refused immediately
// - HalfOpen: cooldown elapsed, probing; a streak of successes closes it
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// How long to stay open before probing again.
    pub cooldown: Duration,
    /// Consecutive half-open successes that close the circuit.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    probe_successes: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    config: CircuitBreakerConfig,
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    /// The breaker refused the call without attempting it.
    CircuitOpen,
    /// The call ran and failed.
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "circuit breaker is open"),
            CircuitBreakerError::OperationFailed(err) => write!(f, "operation failed: {err}"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for CircuitBreakerError<E> {}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                probe_successes: 0,
                opened_at: None,
            }),
            config,
        }
    }

    /// Run `operation` unless the breaker is open.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            return Err(CircuitBreakerError::CircuitOpen);
        }

        match operation.await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                self.on_failure();
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    /// Whether a call may proceed right now. Flips Open to HalfOpen once
    /// the cooldown has elapsed.
    fn admit(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.cooldown)
                    .unwrap_or(true);
                if cooled_down {
                    tracing::info!("Circuit breaker half-open; probing downstream");
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn on_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.probe_successes += 1;
                if inner.probe_successes >= self.config.success_threshold {
                    tracing::info!(probes = inner.probe_successes, "Circuit breaker closed");
                    inner.state = CircuitState::Closed;
                    inner.consecutive_failures = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures += 1;

        match inner.state {
            CircuitState::Closed if inner.consecutive_failures >= self.config.failure_threshold => {
                tracing::warn!(
                    failures = inner.consecutive_failures,
                    "Circuit breaker opened"
                );
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                tracing::warn!("Probe failed; circuit breaker reopened");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, cooldown_ms: u64, success_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            cooldown: Duration::from_millis(cooldown_ms),
            success_threshold,
        })
    }

    #[tokio::test]
    async fn test_opens_after_consecutive_failures_and_fails_fast() {
        let cb = breaker(3, 60_000, 1);

        for _ in 0..3 {
            let result = cb.call(async { Err::<(), _>("refused") }).await;
            assert!(result.is_err());
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let refused = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(refused, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn test_a_success_resets_the_failure_streak() {
        let cb = breaker(3, 60_000, 1);

        let _ = cb.call(async { Err::<(), _>("blip") }).await;
        let _ = cb.call(async { Err::<(), _>("blip") }).await;
        let _ = cb.call(async { Ok::<_, &str>(()) }).await;
        let _ = cb.call(async { Err::<(), _>("blip") }).await;

        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_closes_again_after_successful_probes() {
        let cb = breaker(1, 10, 2);

        let _ = cb.call(async { Err::<(), _>("down") }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(cb.call(async { Ok::<_, &str>(()) }).await.is_ok());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert!(cb.call(async { Ok::<_, &str>(()) }).await.is_ok());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_a_failed_probe_reopens_the_circuit() {
        let cb = breaker(1, 10, 1);

        let _ = cb.call(async { Err::<(), _>("down") }).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let _ = cb.call(async { Err::<(), _>("still down") }).await;
        assert_eq!(cb.state(), CircuitState::Open);

        let refused = cb.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(refused, Err(CircuitBreakerError::CircuitOpen)));
    }
}
