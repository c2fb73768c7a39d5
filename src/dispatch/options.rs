//! Per-dispatch budget.

use std::time::Duration;

use crate::config::DispatchConfig;

/// Attempt and time budget for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Downstream invocations allowed, across all pools.
    pub max_attempts: u32,
    /// Total time allowed, including token waits and retries.
    pub deadline: Duration,
}

impl DispatchOptions {
    pub fn new(max_attempts: u32, deadline: Duration) -> Self {
        Self {
            max_attempts,
            deadline,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.deadline_ms))
    }
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}
