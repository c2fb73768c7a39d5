//! Pool registry subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch for (service_class, tenant_id)
//!     → manager.rs (pools of that class)
//!     → Apply selection:
//!         - shard.rs (tenant → shard owner, replica / ranged messaging)
//!         - round_robin.rs (rotate through pools otherwise, or on failover)
//!     → exclusion.rs (skip pools that recently failed)
//!     → Return pool or NoPoolAvailable
//! ```
//!
//! # Design Decisions
//! - Pools are immutable after startup; only exclusion flags change
//! - Exclusion flags are per pool, never one lock for the whole registry
//! - Fail-open on full exclusion is an explicit, switchable policy

pub mod exclusion;
pub mod manager;
pub mod pool;
pub mod round_robin;
pub mod shard;

pub use exclusion::{FailOpenPolicy, FailedPoolSet};
pub use manager::{NoPoolAvailable, PoolRegistry};
pub use pool::{Pool, PoolId};
pub use round_robin::RoundRobin;
pub use shard::ShardMap;
