//! Tenant-sharded read routing and primary write routing.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{Credential, PrimaryConfig, ServiceClass};
use crate::registry::{NoPoolAvailable, Pool, PoolRegistry};

/// The single write target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primary {
    pub name: String,
    pub endpoint: String,
    pub credential: Credential,
}

impl From<&PrimaryConfig> for Primary {
    fn from(config: &PrimaryConfig) -> Self {
        Self {
            name: config.name.clone(),
            endpoint: config.endpoint.clone(),
            credential: config.credential.clone(),
        }
    }
}

/// Where a tenant's reads currently go.
#[derive(Debug, Clone, Serialize)]
pub struct ReadRoute {
    pub tenant_id: i64,
    pub shard: Option<u32>,
    /// Replica serving the reads.
    pub pool: String,
    /// False when the shard owner was skipped for another replica.
    pub on_owner: bool,
    pub primary: String,
}

/// Routes reads to replicas by tenant and writes to the primary.
#[derive(Debug, Clone)]
pub struct ReplicaRouter {
    registry: Arc<PoolRegistry>,
    primary: Arc<Primary>,
}

impl ReplicaRouter {
    pub fn new(registry: Arc<PoolRegistry>, primary: Primary) -> Self {
        Self {
            registry,
            primary: Arc::new(primary),
        }
    }

    /// Replica for a tenant's reads: the shard owner while it is healthy,
    /// otherwise another healthy replica.
    pub fn route_read(&self, tenant_id: i64) -> Result<Arc<Pool>, NoPoolAvailable> {
        let pool = self.registry.select_for_tenant(ServiceClass::Replica, tenant_id)?;
        tracing::trace!(tenant_id, pool = %pool.name, "Routed read");
        Ok(pool)
    }

    /// The primary. Never sharded, never gated.
    pub fn route_write(&self) -> Arc<Primary> {
        Arc::clone(&self.primary)
    }

    /// Where the tenant's next read would go, with its shard index. Leaves
    /// the round-robin cursor and exclusion set untouched.
    pub fn describe(&self, tenant_id: i64) -> Result<ReadRoute, NoPoolAvailable> {
        let pool = self.registry.preview_for_tenant(ServiceClass::Replica, tenant_id)?;
        let shard = self.registry.shard_for(ServiceClass::Replica, tenant_id);
        let owner = self.registry.shard_owner(ServiceClass::Replica, tenant_id);
        Ok(ReadRoute {
            tenant_id,
            shard,
            pool: pool.name.clone(),
            on_owner: owner == Some(pool.id),
            primary: self.primary.name.clone(),
        })
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }
}
