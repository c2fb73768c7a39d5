//! Resilient invoker: one logical downstream call, with failover.
//!
//! # Responsibilities
//! - Select a pool (tenant-sharded or round-robin) per attempt
//! - Take a rate-limit token, waiting no longer than the deadline allows
//! - Run the caller's downstream function through the pool's breaker
//! - Record health, exclude failing pools, and retry on the next candidate
//!
//! The deadline is the only cancellation mechanism: it bounds token waits,
//! pauses between attempts, and each downstream call. A call cut off by the
//! deadline ends the dispatch but leaves the pool's breaker and health as
//! they were.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{DispatchConfig, ServiceClass};
use crate::dispatch::error::{AttemptError, DispatchError, DownstreamError};
use crate::dispatch::options::DispatchOptions;
use crate::health::snapshot::{unix_millis, HealthSnapshot, PoolStatus};
use crate::health::HealthTracker;
use crate::observability::metrics;
use crate::registry::{Pool, PoolId, PoolRegistry};
use crate::resilience::backoff::calculate_backoff;
use crate::resilience::{BreakerError, CircuitBreaker, TokenBucketLimiter};

/// Shortest pause while waiting for a token; keeps float rounding from
/// turning the wait into a busy loop.
const MIN_TOKEN_WAIT: Duration = Duration::from_millis(1);

/// Per-pool admission guards.
#[derive(Debug)]
struct PoolGuards {
    limiter: TokenBucketLimiter,
    breaker: CircuitBreaker,
}

impl PoolGuards {
    fn for_pool(pool: &Pool) -> Self {
        Self {
            limiter: TokenBucketLimiter::per_minute(pool.rate_limit_per_minute, pool.burst_fraction),
            breaker: CircuitBreaker::new(pool.name.clone(), pool.failure_threshold, pool.cooldown),
        }
    }
}

/// Dispatches calls to downstream pools with rate limiting, circuit breaking
/// and failover. Construct once at startup and share behind an `Arc`.
#[derive(Debug)]
pub struct ResilientInvoker {
    registry: Arc<PoolRegistry>,
    guards: Vec<PoolGuards>,
    defaults: DispatchOptions,
    backoff_base_ms: u64,
    backoff_max_ms: u64,
}

impl ResilientInvoker {
    pub fn new(registry: Arc<PoolRegistry>, config: &DispatchConfig) -> Self {
        let guards = registry.pools().iter().map(|p| PoolGuards::for_pool(p)).collect();
        Self {
            registry,
            guards,
            defaults: DispatchOptions::from_config(config),
            backoff_base_ms: config.backoff_base_ms,
            backoff_max_ms: config.backoff_max_ms,
        }
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    pub fn health(&self) -> &Arc<HealthTracker> {
        self.registry.health()
    }

    pub fn breaker(&self, pool: PoolId) -> Option<&CircuitBreaker> {
        self.guards.get(pool.index()).map(|g| &g.breaker)
    }

    /// [`dispatch`](Self::dispatch) with the configured default options.
    pub async fn dispatch_default<F, Fut, T, E>(
        &self,
        class: ServiceClass,
        tenant_id: i64,
        call: F,
    ) -> Result<T, DispatchError>
    where
        F: Fn(Arc<Pool>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<DownstreamError>,
    {
        self.dispatch(class, tenant_id, call, self.defaults).await
    }

    /// Run `call` against a pool of `class` on behalf of `tenant_id`,
    /// failing over to other pools until it succeeds, `max_attempts` calls
    /// have been made, or the deadline passes.
    pub async fn dispatch<F, Fut, T, E>(
        &self,
        class: ServiceClass,
        tenant_id: i64,
        call: F,
        opts: DispatchOptions,
    ) -> Result<T, DispatchError>
    where
        F: Fn(Arc<Pool>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<DownstreamError>,
    {
        let span = tracing::debug_span!(
            "dispatch",
            dispatch_id = %Uuid::new_v4(),
            class = %class,
            tenant_id,
        );
        let start = Instant::now();

        let result = self.run(class, tenant_id, call, opts).instrument(span).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.outcome(),
        };
        metrics::record_dispatch(class, outcome, start);
        result
    }

    async fn run<F, Fut, T, E>(
        &self,
        class: ServiceClass,
        tenant_id: i64,
        call: F,
        opts: DispatchOptions,
    ) -> Result<T, DispatchError>
    where
        F: Fn(Arc<Pool>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<DownstreamError>,
    {
        let deadline = Instant::now() + opts.deadline;
        let max_attempts = opts.max_attempts.max(1);
        let mut pools_tried: Vec<String> = Vec::new();
        let mut last_error: Option<AttemptError> = None;
        let mut attempts = 0u32;

        while attempts < max_attempts {
            if Instant::now() >= deadline {
                tracing::debug!(attempts, "Deadline reached before next attempt");
                break;
            }

            let pool = match self.registry.select(class, tenant_id) {
                Ok(pool) => pool,
                Err(e) if attempts == 0 => {
                    tracing::warn!(error = %e, "No pool to dispatch to");
                    return Err(e.into());
                }
                // Every remaining candidate was excluded after earlier
                // failures; report what was tried.
                Err(_) => break,
            };
            let guards = &self.guards[pool.id.index()];

            self.acquire_token(class, &pool, &guards.limiter, deadline).await?;

            attempts += 1;
            pools_tried.push(pool.name.clone());
            let attempt_start = Instant::now();

            // A deadline cut-off is not a pool failure: dropping the breaker
            // future releases any half-open trial without recording one.
            let call_ref = &call;
            let pool_ref = &pool;
            let guarded = guards.breaker.call(move || async move {
                call_ref(Arc::clone(pool_ref)).await.map_err(|e| AttemptError::Downstream {
                    pool: pool_ref.name.clone(),
                    source: e.into(),
                })
            });

            let outcome = match tokio::time::timeout_at(deadline, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let err = AttemptError::DeadlineElapsed {
                        pool: pool.name.clone(),
                    };
                    metrics::record_attempt(&pool.name, err.outcome());
                    tracing::debug!(pool = %pool.name, attempt = attempts, "Deadline cut off downstream call");
                    last_error = Some(err);
                    break;
                }
            };

            match outcome {
                Ok(value) => {
                    let latency = attempt_start.elapsed();
                    self.health().record_success(pool.id, latency);
                    self.registry.mark_healthy(pool.id);
                    metrics::record_attempt(&pool.name, "success");
                    tracing::debug!(pool = %pool.name, attempt = attempts, latency = ?latency, "Dispatch succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    let err = match err {
                        BreakerError::Open(e) => AttemptError::CircuitOpen(e),
                        BreakerError::Downstream(e) => e,
                    };
                    self.health().record_failure(pool.id);
                    self.registry.mark_failed(pool.id);
                    metrics::record_attempt(&pool.name, err.outcome());
                    tracing::warn!(pool = %pool.name, attempt = attempts, error = %err, "Dispatch attempt failed");
                    last_error = Some(err);
                }
            }

            if attempts < max_attempts {
                self.pause_before_retry(attempts, deadline).await;
            }
        }

        tracing::warn!(attempts, pools = ?pools_tried, "Dispatch exhausted");
        Err(DispatchError::PoolExhausted {
            class,
            pools_tried,
            last_error,
        })
    }

    /// Take one token from the pool's bucket, sleeping for refills but never
    /// past the deadline.
    async fn acquire_token(
        &self,
        class: ServiceClass,
        pool: &Pool,
        limiter: &TokenBucketLimiter,
        deadline: Instant,
    ) -> Result<(), DispatchError> {
        let started = Instant::now();
        loop {
            if limiter.acquire(1.0) {
                return Ok(());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                metrics::record_rate_limited(&pool.name);
                tracing::warn!(pool = %pool.name, "Rate limited until deadline");
                return Err(DispatchError::RateLimited {
                    class,
                    pool: pool.name.clone(),
                    waited: started.elapsed(),
                });
            }

            let wait = limiter.wait_time(1.0).max(MIN_TOKEN_WAIT).min(remaining);
            tracing::debug!(pool = %pool.name, wait = ?wait, "Waiting for rate-limit token");
            tokio::time::sleep(wait).await;
        }
    }

    async fn pause_before_retry(&self, attempt: u32, deadline: Instant) {
        let delay = calculate_backoff(attempt, self.backoff_base_ms, self.backoff_max_ms);
        if delay.is_zero() {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(delay.min(remaining)).await;
    }

    /// Read-only view of every pool's health and breaker state.
    pub fn health_snapshot(&self) -> HealthSnapshot {
        let health = self.health();
        let pools = self
            .registry
            .pools()
            .iter()
            .map(|pool| {
                let h = health.get(pool.id).unwrap_or_default();
                let breaker_state = self
                    .breaker(pool.id)
                    .map(|b| b.state().to_string())
                    .unwrap_or_default();
                let status = PoolStatus {
                    service_class: pool.service_class,
                    healthy: h.is_healthy,
                    excluded: self.registry.is_excluded(pool.id),
                    failure_count: h.failure_count,
                    last_failure: h.last_failure_at.map(unix_millis),
                    last_success: h.last_success_at.map(unix_millis),
                    latency_ms: h.last_latency.map(|d| d.as_millis() as u64),
                    breaker_state,
                };
                (pool.name.clone(), status)
            })
            .collect();
        HealthSnapshot::from_pools(pools)
    }
}
