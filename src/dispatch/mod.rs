//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Business logic: dispatch(class, tenant_id, call, options)
//!     → registry (pick pool: shard owner or round-robin)
//!     → rate limiter (token, bounded wait)
//!     → circuit breaker (fail fast or run call)
//!     → success: health.record_success, registry.mark_healthy, return
//!     → failure: health.record_failure, registry.mark_failed, next attempt
//!     → exhausted: PoolExhausted { pools_tried, last_error }
//! ```
//!
//! # Design Decisions
//! - The caller supplies the downstream call; this layer never builds requests
//! - Only exhaustion or missing configuration reach the caller
//! - The deadline bounds everything, including the downstream call itself

pub mod error;
pub mod invoker;
pub mod options;

pub use error::{AttemptError, DispatchError, DownstreamError};
pub use invoker::ResilientInvoker;
pub use options::DispatchOptions;
