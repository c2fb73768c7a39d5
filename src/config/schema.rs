//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatch
//! layer. All types derive Serde traits for deserialization from config files.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the dispatch layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GateConfig {
    /// Default retry/deadline budget for dispatches.
    pub dispatch: DispatchConfig,

    /// Breaker and health thresholds per service class.
    pub classes: ClassesConfig,

    /// Downstream pool definitions.
    pub pools: Vec<PoolConfig>,

    /// Write target for the replica router.
    pub primary: Option<PrimaryConfig>,

    /// Read-only admin HTTP surface.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Downstream service class a pool belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceClass {
    /// AI-completion backends.
    Ai,
    /// Messaging-gateway accounts.
    Messaging,
    /// Database read replicas.
    Replica,
}

impl ServiceClass {
    /// All classes, in a stable order.
    pub const ALL: [ServiceClass; 3] = [ServiceClass::Ai, ServiceClass::Messaging, ServiceClass::Replica];

    /// Lowercase label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceClass::Ai => "ai",
            ServiceClass::Messaging => "messaging",
            ServiceClass::Replica => "replica",
        }
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque credential handed to the downstream call. Never printed.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Expose the raw secret to the downstream call.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Dispatch defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum downstream attempts per dispatch.
    pub max_attempts: u32,

    /// Overall deadline per dispatch in milliseconds, retries included.
    pub deadline_ms: u64,

    /// Clear the exclusion set when every pool of a class is excluded.
    pub fail_open_on_full_exclusion: bool,

    /// Base pause between attempts in milliseconds (0 disables).
    pub backoff_base_ms: u64,

    /// Cap on the pause between attempts in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            deadline_ms: 10_000,
            fail_open_on_full_exclusion: true,
            backoff_base_ms: 0,
            backoff_max_ms: 0,
        }
    }
}

/// Thresholds for every pool in one service class.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassConfig {
    /// Consecutive failures that open a pool's breaker.
    pub failure_threshold: u32,

    /// How long an open breaker rejects calls, in milliseconds.
    pub cooldown_ms: u64,

    /// Consecutive failures after which a pool is reported unhealthy.
    pub unhealthy_threshold: u32,
}

impl ClassConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for ClassConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_ms: 60_000,
            unhealthy_threshold: 1,
        }
    }
}

/// Per-class threshold table.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClassesConfig {
    pub ai: ClassConfig,
    pub messaging: ClassConfig,
    pub replica: ClassConfig,
}

impl ClassesConfig {
    pub fn get(&self, class: ServiceClass) -> &ClassConfig {
        match class {
            ServiceClass::Ai => &self.ai,
            ServiceClass::Messaging => &self.messaging,
            ServiceClass::Replica => &self.replica,
        }
    }
}

/// A single downstream pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Class this pool serves.
    pub service_class: ServiceClass,

    /// Unique pool identifier.
    pub name: String,

    /// Connection endpoint (URL).
    pub endpoint: String,

    /// Opaque credential passed to the downstream call.
    #[serde(default)]
    pub credential: Credential,

    /// Sustained rate the pool accepts.
    pub rate_limit_per_minute: u32,

    /// Share of the per-minute rate allowed as an instantaneous burst.
    #[serde(default = "default_burst_fraction")]
    pub burst_fraction: f64,

    /// Inclusive range of shard indices owned by this pool.
    #[serde(default)]
    pub shard_range: Option<[u32; 2]>,

    /// Overrides the class breaker threshold.
    #[serde(default)]
    pub failure_threshold: Option<u32>,

    /// Overrides the class breaker cooldown, in milliseconds.
    #[serde(default)]
    pub cooldown_ms: Option<u64>,
}

fn default_burst_fraction() -> f64 {
    0.1
}

impl PoolConfig {
    /// Minimal pool definition, mostly useful in tests.
    pub fn new(service_class: ServiceClass, name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            service_class,
            name: name.into(),
            endpoint: endpoint.into(),
            credential: Credential::default(),
            rate_limit_per_minute: 6_000,
            burst_fraction: default_burst_fraction(),
            shard_range: None,
            failure_threshold: None,
            cooldown_ms: None,
        }
    }
}

/// Primary (write) store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PrimaryConfig {
    #[serde(default = "default_primary_name")]
    pub name: String,
    pub endpoint: String,
    #[serde(default)]
    pub credential: Credential,
}

fn default_primary_name() -> String {
    "primary".to_string()
}

/// Admin HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin endpoints.
    pub enabled: bool,

    /// Admin bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) when RUST_LOG is unset.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
