//! Observability view of pool health.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::ServiceClass;

/// Health of one pool as exposed to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    pub service_class: ServiceClass,
    pub healthy: bool,
    pub excluded: bool,
    pub failure_count: u32,
    /// Milliseconds since the Unix epoch.
    pub last_failure: Option<u64>,
    /// Milliseconds since the Unix epoch.
    pub last_success: Option<u64>,
    pub latency_ms: Option<u64>,
    pub breaker_state: String,
}

/// Health of every pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub pools: BTreeMap<String, PoolStatus>,
    pub total_pools: usize,
    pub healthy_pools: usize,
}

impl HealthSnapshot {
    pub fn from_pools(pools: BTreeMap<String, PoolStatus>) -> Self {
        let healthy_pools = pools.values().filter(|p| p.healthy).count();
        Self {
            total_pools: pools.len(),
            healthy_pools,
            pools,
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn unix_millis(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
