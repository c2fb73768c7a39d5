//! Health tracking subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch attempt finishes
//!     → tracker.rs (record success/failure, latency, timestamps)
//!     → registry consults is_healthy() for shard failover
//!
//! Observability:
//!     tracker.rs + breaker states
//!     → snapshot.rs (HealthSnapshot, read-only, safe during dispatch)
//! ```
//!
//! # Design Decisions
//! - Health is per pool, each pool behind its own lock
//! - Success always resets a pool to healthy
//! - Consecutive failures beyond a threshold mark a pool unhealthy

pub mod snapshot;
pub mod tracker;

pub use snapshot::{HealthSnapshot, PoolStatus};
pub use tracker::{HealthTracker, PoolHealth};
