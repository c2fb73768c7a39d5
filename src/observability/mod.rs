//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Admin API health snapshot (see crate::admin)
//! ```
//!
//! # Design Decisions
//! - Every dispatch runs in a span carrying a dispatch ID
//! - Metrics are cheap (atomic increments) and never fail a call

pub mod logging;
pub mod metrics;
