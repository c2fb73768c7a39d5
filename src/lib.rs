//! Multi-tenant resilience and dispatch layer.
//!
//! Callers hand [`dispatch::ResilientInvoker::dispatch`] a service class, a
//! tenant and a downstream call; the invoker picks a pool, takes a
//! rate-limit token, runs the call through the pool's circuit breaker and
//! fails over until it succeeds or its budget runs out.

pub mod config;
pub mod registry;
pub mod resilience;
pub mod health;
pub mod dispatch;
pub mod routing;
pub mod observability;
pub mod admin;
pub mod lifecycle;

pub use config::{GateConfig, ServiceClass};
pub use dispatch::{DispatchError, DispatchOptions, ResilientInvoker};
pub use lifecycle::Shutdown;
pub use routing::ReplicaRouter;
