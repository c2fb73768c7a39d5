//! Pool abstraction.
//!
//! # Responsibilities
//! - Represent a single configured downstream target
//! - Carry its resolved breaker/health thresholds
//! - Answer which shard indices it owns

use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::config::{ClassConfig, Credential, PoolConfig, ServiceClass};

/// Position of a pool in configuration order. Stable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(usize);

impl PoolId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A configured downstream pool. Immutable after startup.
#[derive(Debug, Clone)]
pub struct Pool {
    pub id: PoolId,
    pub name: String,
    pub service_class: ServiceClass,
    pub endpoint: String,
    pub credential: Credential,
    pub rate_limit_per_minute: u32,
    pub burst_fraction: f64,
    /// Shard indices owned by this pool (replica / messaging only).
    pub shard_range: Option<RangeInclusive<u32>>,
    pub failure_threshold: u32,
    pub cooldown: Duration,
    pub unhealthy_threshold: u32,
}

impl Pool {
    /// Build a pool, resolving per-pool overrides against its class defaults.
    pub fn from_config(id: PoolId, config: &PoolConfig, class: &ClassConfig) -> Self {
        Self {
            id,
            name: config.name.clone(),
            service_class: config.service_class,
            endpoint: config.endpoint.clone(),
            credential: config.credential.clone(),
            rate_limit_per_minute: config.rate_limit_per_minute,
            burst_fraction: config.burst_fraction,
            shard_range: config.shard_range.map(|[start, end]| start..=end),
            failure_threshold: config.failure_threshold.unwrap_or(class.failure_threshold),
            cooldown: config
                .cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| class.cooldown()),
            unhealthy_threshold: class.unhealthy_threshold,
        }
    }
}
