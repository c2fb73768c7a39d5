//! Startup orchestration.
//!
//! Builds the shared service objects from a validated configuration, in
//! dependency order. Nothing is spawned here; the binary decides what runs.

use std::sync::Arc;

use thiserror::Error;

use crate::admin::AdminState;
use crate::config::{validate_config, GateConfig, ValidationError};
use crate::dispatch::ResilientInvoker;
use crate::health::HealthTracker;
use crate::registry::{FailOpenPolicy, Pool, PoolId, PoolRegistry};
use crate::routing::{Primary, ReplicaRouter};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("invalid configuration: {}", join(.0))]
    Invalid(Vec<ValidationError>),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Everything a running process shares.
pub struct GateServices {
    pub config: GateConfig,
    pub registry: Arc<PoolRegistry>,
    pub invoker: Arc<ResilientInvoker>,
    pub replicas: Option<ReplicaRouter>,
}

impl GateServices {
    pub fn admin_state(&self) -> AdminState {
        AdminState {
            invoker: Arc::clone(&self.invoker),
            replicas: self.replicas.clone(),
        }
    }
}

/// Build the service graph. Re-validates, so callers may pass a config
/// assembled in code.
pub fn build(config: GateConfig) -> Result<GateServices, StartupError> {
    validate_config(&config).map_err(StartupError::Invalid)?;

    let pools: Vec<Pool> = config
        .pools
        .iter()
        .enumerate()
        .map(|(index, pool)| Pool::from_config(PoolId::new(index), pool, config.classes.get(pool.service_class)))
        .collect();

    let health = Arc::new(HealthTracker::new(&pools));
    let policy = FailOpenPolicy::from_flag(config.dispatch.fail_open_on_full_exclusion);
    let registry = Arc::new(PoolRegistry::new(pools, policy, health));
    let invoker = Arc::new(ResilientInvoker::new(Arc::clone(&registry), &config.dispatch));
    let replicas = config
        .primary
        .as_ref()
        .map(|primary| ReplicaRouter::new(Arc::clone(&registry), Primary::from(primary)));

    tracing::info!(
        pools = registry.pools().len(),
        fail_open = ?policy,
        replica_router = replicas.is_some(),
        "Dispatch services ready"
    );

    Ok(GateServices {
        config,
        registry,
        invoker,
        replicas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PoolConfig, PrimaryConfig, ServiceClass};

    #[test]
    fn test_build_resolves_class_thresholds() {
        let mut config = GateConfig::default();
        config.classes.messaging.failure_threshold = 5;
        config.pools.push(PoolConfig::new(ServiceClass::Messaging, "sms-1", "https://sms-1.example"));
        config.pools.push(PoolConfig::new(ServiceClass::Replica, "replica-a", "postgres://replica-a/app"));
        config.primary = Some(PrimaryConfig {
            name: "primary".into(),
            endpoint: "postgres://primary/app".into(),
            credential: Default::default(),
        });

        let services = build(config).unwrap();
        let sms = services.registry.by_name("sms-1").unwrap();
        assert_eq!(sms.failure_threshold, 5);
        assert_eq!(services.invoker.breaker(sms.id).unwrap().consecutive_failures(), 0);
        assert_eq!(services.replicas.unwrap().route_write().name, "primary");
    }

    #[test]
    fn test_build_with_full_width_shard_range() {
        let mut config = GateConfig::default();
        let mut replica = PoolConfig::new(ServiceClass::Replica, "replica-a", "postgres://replica-a/app");
        replica.shard_range = Some([0, u32::MAX]);
        config.pools.push(replica);
        config.primary = Some(PrimaryConfig {
            name: "primary".into(),
            endpoint: "postgres://primary/app".into(),
            credential: Default::default(),
        });

        let services = build(config).unwrap();
        let router = services.replicas.unwrap();
        assert_eq!(router.route_read(123_456_789).unwrap().name, "replica-a");
        assert_eq!(services.registry.shard_for(ServiceClass::Replica, 1), Some(0));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = GateConfig::default();
        config.dispatch.max_attempts = 0;
        assert!(matches!(build(config), Err(StartupError::Invalid(_))));
    }
}
