//! Circuit breaker protecting the external swap router: 3
//! consecutive failures open it for 30 s; the next call attempts a
//! half-open probe; a success closes it.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

const FAILURE_THRESHOLD: u32 = 3;
const OPEN_DURATION: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    inner: Mutex<Inner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a call may proceed right now. Transitions
    /// Open -> HalfOpen once the open window elapses.
    pub async fn allow(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::Closed => true,
            State::HalfOpen => true,
            State::Open => {
                if inner.opened_at.is_some_and(|t| t.elapsed() >= OPEN_DURATION) {
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
            }
            State::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= FAILURE_THRESHOLD {
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_three_consecutive_failures() {
        let breaker = CircuitBreaker::new();
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        assert!(!breaker.allow().await);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new();
        breaker.record_failure().await;
        breaker.record_failure().await;
        breaker.record_success().await;
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert!(breaker.allow().await);
    }

    #[tokio::test]
    async fn half_open_probe_failure_reopens() {
        let breaker = CircuitBreaker::new();
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        {
            let mut inner = breaker.inner.lock().await;
            inner.opened_at = Some(Instant::now() - Duration::from_secs(31));
        }
        assert!(breaker.allow().await);
        breaker.record_failure().await;
        assert!(!breaker.allow().await);
    }
}
