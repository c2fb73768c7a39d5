//! Replica routing subsystem.
//!
//! # Data Flow
//! ```text
//! Read(tenant_id)
//!     → registry.select_for_tenant(Replica, tenant_id)
//!     → shard owner if healthy, else another healthy replica
//!     → storage layer opens the connection
//!
//! Write()
//!     → primary, always (no sharding, no breaker)
//! ```
//!
//! # Design Decisions
//! - The router only picks targets; connections belong to the storage layer
//! - Shard health is re-evaluated on every read, so failover and recovery
//!   need no coordination

pub mod replica;
pub mod storage;

pub use replica::{Primary, ReadRoute, ReplicaRouter};
pub use storage::{ShardedStore, StorageError};
