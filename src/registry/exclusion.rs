//! Failed-pool exclusion set.
//!
//! One atomic flag per pool: marking or clearing a pool never contends with
//! any other pool.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::registry::pool::PoolId;

/// What to do when every pool of a class is excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailOpenPolicy {
    /// Clear the class's exclusions and select again.
    #[default]
    FailOpenOnFullExclusion,
    /// Report that no pool is available.
    FailClosed,
}

impl FailOpenPolicy {
    pub fn from_flag(fail_open: bool) -> Self {
        if fail_open {
            FailOpenPolicy::FailOpenOnFullExclusion
        } else {
            FailOpenPolicy::FailClosed
        }
    }
}

/// Pools currently excluded from round-robin selection.
#[derive(Debug)]
pub struct FailedPoolSet {
    flags: Vec<AtomicBool>,
}

impl FailedPoolSet {
    pub fn new(pool_count: usize) -> Self {
        Self {
            flags: (0..pool_count).map(|_| AtomicBool::new(false)).collect(),
        }
    }

    /// Exclude a pool. Returns true if it was not already excluded.
    pub fn mark_failed(&self, pool: PoolId) -> bool {
        self.flags
            .get(pool.index())
            .map(|f| !f.swap(true, Ordering::AcqRel))
            .unwrap_or(false)
    }

    /// Re-admit a pool. Returns true if it was excluded.
    pub fn mark_healthy(&self, pool: PoolId) -> bool {
        self.flags
            .get(pool.index())
            .map(|f| f.swap(false, Ordering::AcqRel))
            .unwrap_or(false)
    }

    pub fn is_failed(&self, pool: PoolId) -> bool {
        self.flags
            .get(pool.index())
            .map(|f| f.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    /// Re-admit every pool in `members`.
    pub fn clear(&self, members: &[PoolId]) {
        for id in members {
            self.mark_healthy(*id);
        }
    }

    /// Every excluded pool, in configuration order.
    pub fn failed(&self) -> Vec<PoolId> {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, f)| f.load(Ordering::Acquire))
            .map(|(i, _)| PoolId::new(i))
            .collect()
    }
}
