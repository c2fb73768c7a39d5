//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dispatch_gate::config::{GateConfig, PoolConfig, PrimaryConfig, ServiceClass};
use dispatch_gate::lifecycle::{self, GateServices};
use dispatch_gate::registry::Pool;
use thiserror::Error;

/// Error returned by scripted downstream calls.
#[derive(Debug, Error)]
#[error("{pool} failed")]
pub struct Boom {
    pub pool: String,
}

/// Pool config with generous limits.
pub fn pool(class: ServiceClass, name: &str) -> PoolConfig {
    PoolConfig::new(class, name, format!("https://{}.example", name))
}

pub fn replica(name: &str) -> PoolConfig {
    PoolConfig::new(ServiceClass::Replica, name, format!("postgres://{}:5432/app", name))
}

/// Config with the given pools, a primary, and no network listeners.
pub fn gate_config(pools: Vec<PoolConfig>) -> GateConfig {
    let mut config = GateConfig::default();
    config.pools = pools;
    config.primary = Some(PrimaryConfig {
        name: "primary".into(),
        endpoint: "postgres://primary:5432/app".into(),
        credential: Default::default(),
    });
    config.admin.enabled = false;
    config.observability.metrics_enabled = false;
    config
}

pub fn services(pools: Vec<PoolConfig>) -> GateServices {
    lifecycle::build(gate_config(pools)).expect("test config should be valid")
}

/// Counts downstream calls per pool.
#[derive(Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<HashMap<String, u32>>>,
}

impl CallLog {
    pub fn record(&self, pool: &Pool) {
        *self.calls.lock().unwrap().entry(pool.name.clone()).or_default() += 1;
    }

    pub fn count(&self, pool: &str) -> u32 {
        self.calls.lock().unwrap().get(pool).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

/// Downstream call that waits `delay`, then fails.
pub async fn fail_after(pool: Arc<Pool>, delay: Duration) -> Result<(), Boom> {
    tokio::time::sleep(delay).await;
    Err(Boom {
        pool: pool.name.clone(),
    })
}
