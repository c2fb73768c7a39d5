//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Pools → HealthTracker → PoolRegistry
//!     → ResilientInvoker (+ ReplicaRouter when a primary is configured)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → admin server drains → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Service objects are built once; configuration never changes afterwards
//! - Fail fast: any startup error is fatal

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build, GateServices, StartupError};
