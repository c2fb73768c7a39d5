//! Pool registry.
//!
//! # Responsibilities
//! - Hold the configured pools grouped by service class
//! - Select pools round-robin, skipping excluded ones
//! - Select pools by tenant shard, failing over when the owner is unhealthy
//! - Track the failed-pool exclusion set

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::ServiceClass;
use crate::health::HealthTracker;
use crate::observability::metrics;
use crate::registry::exclusion::{FailOpenPolicy, FailedPoolSet};
use crate::registry::pool::{Pool, PoolId};
use crate::registry::round_robin::RoundRobin;
use crate::registry::shard::ShardMap;

/// No configured or eligible pool for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no pool available for service class '{class}'")]
pub struct NoPoolAvailable {
    pub class: ServiceClass,
}

#[derive(Debug)]
struct ClassPools {
    members: Vec<PoolId>,
    cursor: RoundRobin,
    shards: Option<ShardMap>,
}

/// Manages pools per service class and the selection primitives over them.
#[derive(Debug)]
pub struct PoolRegistry {
    pools: Vec<Arc<Pool>>,
    by_name: HashMap<String, PoolId>,
    classes: HashMap<ServiceClass, ClassPools>,
    failed: FailedPoolSet,
    fail_open: FailOpenPolicy,
    health: Arc<HealthTracker>,
}

impl PoolRegistry {
    /// Create a registry. `pools` must be in configuration order, with each
    /// pool's id equal to its position.
    pub fn new(pools: Vec<Pool>, fail_open: FailOpenPolicy, health: Arc<HealthTracker>) -> Self {
        let pools: Vec<Arc<Pool>> = pools.into_iter().map(Arc::new).collect();
        let by_name = pools.iter().map(|p| (p.name.clone(), p.id)).collect();

        let mut classes = HashMap::new();
        for class in ServiceClass::ALL {
            let members: Vec<&Pool> = pools
                .iter()
                .filter(|p| p.service_class == class)
                .map(|p| p.as_ref())
                .collect();
            if members.is_empty() {
                continue;
            }

            let sharded = match class {
                ServiceClass::Replica => true,
                ServiceClass::Messaging => members.iter().any(|p| p.shard_range.is_some()),
                ServiceClass::Ai => false,
            };
            let shards = if sharded { ShardMap::from_pools(&members) } else { None };

            tracing::debug!(
                class = %class,
                pools = members.len(),
                shards = shards.as_ref().map(|s| s.shard_count()).unwrap_or(0),
                "Registered service class"
            );

            classes.insert(
                class,
                ClassPools {
                    members: members.iter().map(|p| p.id).collect(),
                    cursor: RoundRobin::new(),
                    shards,
                },
            );
        }

        Self {
            failed: FailedPoolSet::new(pools.len()),
            pools,
            by_name,
            classes,
            fail_open,
            health,
        }
    }

    pub fn pools(&self) -> &[Arc<Pool>] {
        &self.pools
    }

    pub fn pool(&self, id: PoolId) -> Option<&Arc<Pool>> {
        self.pools.get(id.index())
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<Pool>> {
        self.by_name.get(name).and_then(|id| self.pool(*id))
    }

    pub fn health(&self) -> &Arc<HealthTracker> {
        &self.health
    }

    /// Whether dispatches for `class` are routed by tenant shard.
    pub fn is_sharded(&self, class: ServiceClass) -> bool {
        self.classes
            .get(&class)
            .map(|c| c.shards.is_some())
            .unwrap_or(false)
    }

    /// Shard index a tenant maps to, for sharded classes.
    pub fn shard_for(&self, class: ServiceClass, tenant_id: i64) -> Option<u32> {
        self.classes
            .get(&class)
            .and_then(|c| c.shards.as_ref())
            .map(|s| s.shard_for(tenant_id))
    }

    /// Pool owning the tenant's shard, regardless of health.
    pub fn shard_owner(&self, class: ServiceClass, tenant_id: i64) -> Option<PoolId> {
        self.classes
            .get(&class)
            .and_then(|c| c.shards.as_ref())
            .and_then(|s| s.owner_for(tenant_id))
    }

    /// Selection used by dispatch: tenant-sharded for sharded classes,
    /// round-robin otherwise.
    pub fn select(&self, class: ServiceClass, tenant_id: i64) -> Result<Arc<Pool>, NoPoolAvailable> {
        if self.is_sharded(class) {
            self.select_for_tenant(class, tenant_id)
        } else {
            self.select_round_robin(class)
        }
    }

    /// Next non-excluded pool of `class` in cyclic order.
    ///
    /// When every pool is excluded and the fail-open policy is active, the
    /// class's exclusions are cleared and selection is retried once.
    pub fn select_round_robin(&self, class: ServiceClass) -> Result<Arc<Pool>, NoPoolAvailable> {
        let group = self.group(class)?;
        let not_failed = |id: PoolId| !self.failed.is_failed(id);

        if let Some(id) = group.cursor.next_eligible(&group.members, not_failed) {
            return Ok(self.pools[id.index()].clone());
        }

        if self.fail_open == FailOpenPolicy::FailOpenOnFullExclusion {
            tracing::warn!(class = %class, pools = group.members.len(), "Every pool excluded, clearing exclusions");
            metrics::record_fail_open(class);
            self.failed.clear(&group.members);

            if let Some(id) = group.cursor.next_eligible(&group.members, not_failed) {
                return Ok(self.pools[id.index()].clone());
            }
        }

        tracing::debug!(class = %class, "No eligible pool");
        Err(NoPoolAvailable { class })
    }

    /// Pool owning the tenant's shard, or a healthy alternative of the same
    /// class when the owner is unhealthy or excluded.
    pub fn select_for_tenant(&self, class: ServiceClass, tenant_id: i64) -> Result<Arc<Pool>, NoPoolAvailable> {
        let group = self.group(class)?;
        let Some(shards) = &group.shards else {
            return self.select_round_robin(class);
        };

        let owner = shards.owner_for(tenant_id);
        if let Some(id) = owner {
            if self.is_eligible(id) {
                return Ok(self.pools[id.index()].clone());
            }
        }

        tracing::debug!(
            class = %class,
            tenant_id,
            shard = shards.shard_for(tenant_id),
            owner = ?owner.map(|id| self.pools[id.index()].name.as_str()),
            "Shard owner unavailable, failing over"
        );

        let alternative = group
            .cursor
            .next_eligible(&group.members, |id| Some(id) != owner && self.is_eligible(id));
        match alternative {
            Some(id) => Ok(self.pools[id.index()].clone()),
            None => self.select_round_robin(class),
        }
    }

    /// Pool [`select_for_tenant`](Self::select_for_tenant) would pick right
    /// now, without advancing any cursor or clearing exclusions.
    pub fn preview_for_tenant(&self, class: ServiceClass, tenant_id: i64) -> Result<Arc<Pool>, NoPoolAvailable> {
        let group = self.group(class)?;
        let owner = group.shards.as_ref().and_then(|s| s.owner_for(tenant_id));
        if let Some(id) = owner {
            if self.is_eligible(id) {
                return Ok(self.pools[id.index()].clone());
            }
        }

        let members = &group.members;
        let chosen = group
            .cursor
            .peek_eligible(members, |id| Some(id) != owner && self.is_eligible(id))
            .or_else(|| group.cursor.peek_eligible(members, |id| !self.failed.is_failed(id)))
            .or_else(|| match self.fail_open {
                // A real selection would clear the class and take the next pool.
                FailOpenPolicy::FailOpenOnFullExclusion => group.cursor.peek_eligible(members, |_| true),
                FailOpenPolicy::FailClosed => None,
            });

        chosen
            .map(|id| self.pools[id.index()].clone())
            .ok_or(NoPoolAvailable { class })
    }

    /// Exclude a pool from round-robin selection.
    pub fn mark_failed(&self, pool: PoolId) {
        if self.failed.mark_failed(pool) {
            if let Some(p) = self.pool(pool) {
                tracing::debug!(pool = %p.name, "Pool excluded");
            }
        }
    }

    /// Re-admit a pool to selection.
    pub fn mark_healthy(&self, pool: PoolId) {
        if self.failed.mark_healthy(pool) {
            if let Some(p) = self.pool(pool) {
                tracing::debug!(pool = %p.name, "Pool re-admitted");
            }
        }
    }

    pub fn is_excluded(&self, pool: PoolId) -> bool {
        self.failed.is_failed(pool)
    }

    /// Names of excluded pools, in configuration order.
    pub fn excluded(&self) -> Vec<String> {
        self.failed
            .failed()
            .into_iter()
            .filter_map(|id| self.pool(id).map(|p| p.name.clone()))
            .collect()
    }

    fn is_eligible(&self, id: PoolId) -> bool {
        self.health.is_healthy(id) && !self.failed.is_failed(id)
    }

    fn group(&self, class: ServiceClass) -> Result<&ClassPools, NoPoolAvailable> {
        self.classes
            .get(&class)
            .filter(|g| !g.members.is_empty())
            .ok_or(NoPoolAvailable { class })
    }
}
