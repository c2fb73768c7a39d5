//! Circuit breaker for pool protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: pool assumed down, calls fail fast without reaching downstream
//! - Half-Open: one trial call tests whether the pool recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: first call after cooldown elapsed
//! Half-Open → Closed: trial call succeeds
//! Half-Open → Open: trial call fails (cooldown restarts)
//! ```
//!
//! State fields live behind a mutex that is only held for bookkeeping, never
//! across the downstream call. Half-open admission is a compare-and-swap on
//! a trial flag, so exactly one trial is in flight at a time.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The breaker rejected a call without invoking downstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit open for pool '{pool}' (state: {state}, retry in {retry_in:?})")]
pub struct CircuitOpenError {
    pub pool: String,
    pub state: CircuitState,
    /// Remaining cooldown; zero when rejected because a trial is in flight.
    pub retry_in: Duration,
}

/// Outcome of [`CircuitBreaker::call`] when it does not succeed.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    #[error(transparent)]
    Open(CircuitOpenError),

    #[error("downstream call failed: {0}")]
    Downstream(E),
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// How a call was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Trial,
}

/// Per-pool circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    pool: String,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerInner>,
    trial_in_flight: AtomicBool,
}

impl CircuitBreaker {
    pub fn new(pool: impl Into<String>, failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            pool: pool.into(),
            failure_threshold: failure_threshold.max(1),
            cooldown,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
            trial_in_flight: AtomicBool::new(false),
        }
    }

    pub fn pool(&self) -> &str {
        &self.pool
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Current state as last recorded. An open breaker whose cooldown has
    /// elapsed still reports Open until the next call moves it to Half-Open.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("circuit breaker mutex poisoned").state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner
            .lock()
            .expect("circuit breaker mutex poisoned")
            .consecutive_failures
    }

    /// Run `f` under breaker protection. `f` is invoked at most once, and
    /// never while the breaker is open.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = self.admit().map_err(BreakerError::Open)?;
        let mut permit = TrialPermit {
            breaker: self,
            armed: admission == Admission::Trial,
        };

        let result = f().await;
        permit.armed = false;

        match result {
            Ok(value) => {
                self.on_success(admission);
                Ok(value)
            }
            Err(e) => {
                self.on_failure(admission);
                Err(BreakerError::Downstream(e))
            }
        }
    }

    fn admit(&self) -> Result<Admission, CircuitOpenError> {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");

        match inner.state {
            CircuitState::Closed => Ok(Admission::Normal),
            CircuitState::HalfOpen => self.try_trial(),
            CircuitState::Open => {
                let now = Instant::now();
                let opened_at = inner.opened_at.unwrap_or(now);
                let elapsed = now.duration_since(opened_at);
                if elapsed < self.cooldown {
                    return Err(self.rejection(CircuitState::Open, self.cooldown - elapsed));
                }
                tracing::info!(pool = %self.pool, "Circuit breaker: Open → HalfOpen");
                inner.state = CircuitState::HalfOpen;
                metrics::record_breaker_state(&self.pool, CircuitState::HalfOpen);
                self.try_trial()
            }
        }
    }

    fn try_trial(&self) -> Result<Admission, CircuitOpenError> {
        self.trial_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Admission::Trial)
            .map_err(|_| self.rejection(CircuitState::HalfOpen, Duration::ZERO))
    }

    fn rejection(&self, state: CircuitState, retry_in: Duration) -> CircuitOpenError {
        CircuitOpenError {
            pool: self.pool.clone(),
            state,
            retry_in,
        }
    }

    fn on_success(&self, admission: Admission) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match admission {
            Admission::Trial => {
                tracing::info!(pool = %self.pool, "Circuit breaker: HalfOpen → Closed");
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                self.trial_in_flight.store(false, Ordering::Release);
                metrics::record_breaker_state(&self.pool, CircuitState::Closed);
            }
            Admission::Normal => {
                if inner.state == CircuitState::Closed {
                    inner.consecutive_failures = 0;
                }
            }
        }
    }

    fn on_failure(&self, admission: Admission) {
        let mut inner = self.inner.lock().expect("circuit breaker mutex poisoned");
        match admission {
            Admission::Trial => {
                tracing::warn!(pool = %self.pool, "Circuit breaker: HalfOpen → Open (trial failed)");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                self.trial_in_flight.store(false, Ordering::Release);
                metrics::record_breaker_state(&self.pool, CircuitState::Open);
            }
            Admission::Normal => {
                // Late failures from calls admitted before the breaker opened
                // must not push opened_at forward.
                if inner.state != CircuitState::Closed {
                    return;
                }
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    tracing::warn!(
                        pool = %self.pool,
                        failures = inner.consecutive_failures,
                        "Circuit breaker: Closed → Open"
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                    metrics::record_breaker_state(&self.pool, CircuitState::Open);
                }
            }
        }
    }
}

/// Releases the half-open trial slot if the trial future is dropped before
/// it completes (for example when the dispatch deadline cancels it).
struct TrialPermit<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for TrialPermit<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.trial_in_flight.store(false, Ordering::Release);
        }
    }
}
