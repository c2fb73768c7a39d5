//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt against a selected pool:
//!     → rate_limit.rs (take a token, or learn how long to wait)
//!     → circuit_breaker.rs (fail fast if the pool's circuit is open)
//!     → downstream call
//!     → On failure: backoff.rs (optional jittered pause before the next pool)
//! ```
//!
//! # Design Decisions
//! - One limiter and one breaker per pool, never shared across pools
//! - Neither primitive blocks; waiting is the invoker's decision
//! - Breaker thresholds come from configuration, not constants

pub mod backoff;
pub mod circuit_breaker;
pub mod rate_limit;

pub use circuit_breaker::{BreakerError, CircuitBreaker, CircuitOpenError, CircuitState};
pub use rate_limit::TokenBucketLimiter;
