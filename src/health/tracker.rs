//! Per-pool health bookkeeping.
//!
//! Pure bookkeeping, no decisions: the registry and invoker read the
//! snapshot to make failover choices. Each pool has its own lock, so
//! recording against one pool never waits on another.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::observability::metrics;
use crate::registry::pool::{Pool, PoolId};

/// Health of a single pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolHealth {
    pub is_healthy: bool,
    pub failure_count: u32,
    #[serde(with = "unix_millis")]
    pub last_failure_at: Option<SystemTime>,
    #[serde(with = "unix_millis")]
    pub last_success_at: Option<SystemTime>,
    pub last_latency: Option<Duration>,
}

impl Default for PoolHealth {
    fn default() -> Self {
        Self {
            is_healthy: true,
            failure_count: 0,
            last_failure_at: None,
            last_success_at: None,
            last_latency: None,
        }
    }
}

#[derive(Debug)]
struct TrackedPool {
    name: String,
    unhealthy_threshold: u32,
    health: Mutex<PoolHealth>,
}

/// Rolling health state for every configured pool.
#[derive(Debug)]
pub struct HealthTracker {
    pools: Vec<TrackedPool>,
}

impl HealthTracker {
    /// Track `pools`; each entry's position must equal its [`PoolId`].
    pub fn new<'a>(pools: impl IntoIterator<Item = &'a Pool>) -> Self {
        let pools = pools
            .into_iter()
            .enumerate()
            .map(|(index, pool)| {
                debug_assert_eq!(index, pool.id.index());
                TrackedPool {
                    name: pool.name.clone(),
                    unhealthy_threshold: pool.unhealthy_threshold.max(1),
                    health: Mutex::new(PoolHealth::default()),
                }
            })
            .collect();
        Self { pools }
    }

    /// Record a successful call. Resets the pool to healthy.
    pub fn record_success(&self, pool: PoolId, latency: Duration) {
        let Some(tracked) = self.pools.get(pool.index()) else {
            return;
        };
        let was_healthy = {
            let mut health = tracked.health.lock().expect("health mutex poisoned");
            let was_healthy = health.is_healthy;
            health.is_healthy = true;
            health.failure_count = 0;
            health.last_success_at = Some(SystemTime::now());
            health.last_latency = Some(latency);
            was_healthy
        };
        if !was_healthy {
            tracing::info!(pool = %tracked.name, "Pool recovered");
        }
        metrics::record_pool_health(&tracked.name, true);
    }

    /// Record a failed call. Unknown pools are ignored.
    pub fn record_failure(&self, pool: PoolId) {
        let Some(tracked) = self.pools.get(pool.index()) else {
            return;
        };
        let became_unhealthy = {
            let mut health = tracked.health.lock().expect("health mutex poisoned");
            health.failure_count = health.failure_count.saturating_add(1);
            health.last_failure_at = Some(SystemTime::now());
            let unhealthy = health.failure_count >= tracked.unhealthy_threshold;
            let transition = unhealthy && health.is_healthy;
            if unhealthy {
                health.is_healthy = false;
            }
            transition
        };
        if became_unhealthy {
            tracing::warn!(pool = %tracked.name, "Pool marked unhealthy");
            metrics::record_pool_health(&tracked.name, false);
        }
    }

    /// Force a pool's health flag, e.g. from an external health check.
    pub fn set_healthy(&self, pool: PoolId, healthy: bool) {
        if let Some(tracked) = self.pools.get(pool.index()) {
            let mut health = tracked.health.lock().expect("health mutex poisoned");
            health.is_healthy = healthy;
            if healthy {
                health.failure_count = 0;
            }
            drop(health);
            metrics::record_pool_health(&tracked.name, healthy);
        }
    }

    /// Health flag for one pool. Unknown pools read as unhealthy.
    pub fn is_healthy(&self, pool: PoolId) -> bool {
        self.pools
            .get(pool.index())
            .map(|t| t.health.lock().expect("health mutex poisoned").is_healthy)
            .unwrap_or(false)
    }

    /// Copy of one pool's health.
    pub fn get(&self, pool: PoolId) -> Option<PoolHealth> {
        self.pools
            .get(pool.index())
            .map(|t| t.health.lock().expect("health mutex poisoned").clone())
    }

    /// Copy of every pool's health keyed by pool name.
    pub fn snapshot(&self) -> BTreeMap<String, PoolHealth> {
        self.pools
            .iter()
            .map(|t| {
                let health = t.health.lock().expect("health mutex poisoned").clone();
                (t.name.clone(), health)
            })
            .collect()
    }
}

/// Serialize optional timestamps as milliseconds since the Unix epoch.
mod unix_millis {
    use std::time::SystemTime;

    use serde::{Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error> {
        value.map(crate::health::snapshot::unix_millis).serialize(serializer)
    }
}
