//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (replica pools need a primary)
//! - Validate value ranges (rates > 0, thresholds > 0, addresses parse)
//! - Detect overlapping shard ranges
//!
//! Returns all validation errors, not just the first.

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{GateConfig, ServiceClass};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("pool #{index} has an empty name")]
    EmptyPoolName { index: usize },

    #[error("pool name '{0}' is used more than once")]
    DuplicatePoolName(String),

    #[error("pool '{pool}' has an invalid endpoint '{endpoint}'")]
    InvalidEndpoint { pool: String, endpoint: String },

    #[error("pool '{0}' must allow at least one call per minute")]
    ZeroRateLimit(String),

    #[error("pool '{pool}' has an invalid burst fraction {value}")]
    InvalidBurstFraction { pool: String, value: f64 },

    #[error("pool '{0}' declares a shard range but ai pools are never sharded")]
    UnexpectedShardRange(String),

    #[error("pool '{pool}' has an inverted shard range [{start}, {end}]")]
    InvertedShardRange { pool: String, start: u32, end: u32 },

    #[error("pools '{first}' and '{second}' claim overlapping shards")]
    OverlappingShards { first: String, second: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(String),

    #[error("replica pools are configured but no [primary] is set")]
    MissingPrimary,

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.dispatch.max_attempts == 0 {
        errors.push(ValidationError::ZeroValue("dispatch.max_attempts".into()));
    }
    if config.dispatch.deadline_ms == 0 {
        errors.push(ValidationError::ZeroValue("dispatch.deadline_ms".into()));
    }

    for class in ServiceClass::ALL {
        let c = config.classes.get(class);
        if c.failure_threshold == 0 {
            errors.push(ValidationError::ZeroValue(format!("classes.{}.failure_threshold", class)));
        }
        if c.cooldown_ms == 0 {
            errors.push(ValidationError::ZeroValue(format!("classes.{}.cooldown_ms", class)));
        }
        if c.unhealthy_threshold == 0 {
            errors.push(ValidationError::ZeroValue(format!("classes.{}.unhealthy_threshold", class)));
        }
    }

    let mut seen = HashSet::new();
    // class -> [(start, end, pool)]
    let mut ranges: BTreeMap<ServiceClass, Vec<(u32, u32, &str)>> = BTreeMap::new();

    for (index, pool) in config.pools.iter().enumerate() {
        if pool.name.trim().is_empty() {
            errors.push(ValidationError::EmptyPoolName { index });
        } else if !seen.insert(pool.name.as_str()) {
            errors.push(ValidationError::DuplicatePoolName(pool.name.clone()));
        }

        if Url::parse(&pool.endpoint).is_err() {
            errors.push(ValidationError::InvalidEndpoint {
                pool: pool.name.clone(),
                endpoint: pool.endpoint.clone(),
            });
        }

        if pool.rate_limit_per_minute == 0 {
            errors.push(ValidationError::ZeroRateLimit(pool.name.clone()));
        }

        if !pool.burst_fraction.is_finite() || pool.burst_fraction <= 0.0 {
            errors.push(ValidationError::InvalidBurstFraction {
                pool: pool.name.clone(),
                value: pool.burst_fraction,
            });
        }

        if pool.failure_threshold == Some(0) {
            errors.push(ValidationError::ZeroValue(format!("pools.{}.failure_threshold", pool.name)));
        }
        if pool.cooldown_ms == Some(0) {
            errors.push(ValidationError::ZeroValue(format!("pools.{}.cooldown_ms", pool.name)));
        }

        if let Some([start, end]) = pool.shard_range {
            if pool.service_class == ServiceClass::Ai {
                errors.push(ValidationError::UnexpectedShardRange(pool.name.clone()));
            } else if start > end {
                errors.push(ValidationError::InvertedShardRange {
                    pool: pool.name.clone(),
                    start,
                    end,
                });
            } else {
                ranges
                    .entry(pool.service_class)
                    .or_default()
                    .push((start, end, pool.name.as_str()));
            }
        }
    }

    for claimed in ranges.values_mut() {
        claimed.sort_by_key(|(start, _, _)| *start);
        // Range reaching furthest so far; anything starting at or before
        // its end overlaps it.
        let mut widest: Option<(u32, &str)> = None;
        for &(start, end, name) in claimed.iter() {
            if let Some((widest_end, widest_name)) = widest {
                if start <= widest_end {
                    errors.push(ValidationError::OverlappingShards {
                        first: widest_name.to_string(),
                        second: name.to_string(),
                    });
                }
            }
            if widest.map_or(true, |(widest_end, _)| end > widest_end) {
                widest = Some((end, name));
            }
        }
    }

    let has_replicas = config
        .pools
        .iter()
        .any(|p| p.service_class == ServiceClass::Replica);
    match &config.primary {
        None if has_replicas => errors.push(ValidationError::MissingPrimary),
        Some(primary) if Url::parse(&primary.endpoint).is_err() => {
            errors.push(ValidationError::InvalidEndpoint {
                pool: primary.name.clone(),
                endpoint: primary.endpoint.clone(),
            });
        }
        _ => {}
    }

    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "admin.bind_address",
            value: config.admin.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{PoolConfig, PrimaryConfig, Credential};

    fn replica(name: &str, range: Option<[u32; 2]>) -> PoolConfig {
        let mut p = PoolConfig::new(ServiceClass::Replica, name, format!("postgres://{}:5432/app", name));
        p.shard_range = range;
        p
    }

    fn primary() -> Option<PrimaryConfig> {
        Some(PrimaryConfig {
            name: "primary".into(),
            endpoint: "postgres://primary:5432/app".into(),
            credential: Credential::default(),
        })
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GateConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GateConfig::default();
        config.dispatch.max_attempts = 0;
        let mut bad = PoolConfig::new(ServiceClass::Ai, "ai-1", "not a url");
        bad.rate_limit_per_minute = 0;
        bad.burst_fraction = f64::NAN;
        bad.shard_range = Some([0, 1]);
        config.pools.push(bad);
        config.pools.push(PoolConfig::new(ServiceClass::Ai, "ai-1", "https://ok.example"));

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroValue("dispatch.max_attempts".into())));
        assert!(errors.contains(&ValidationError::ZeroRateLimit("ai-1".into())));
        assert!(errors.contains(&ValidationError::UnexpectedShardRange("ai-1".into())));
        assert!(errors.contains(&ValidationError::DuplicatePoolName("ai-1".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidEndpoint { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidBurstFraction { .. })));
    }

    #[test]
    fn test_overlapping_shards_rejected() {
        let mut config = GateConfig::default();
        config.primary = primary();
        config.pools.push(replica("r0", Some([0, 2])));
        config.pools.push(replica("r1", Some([2, 4])));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::OverlappingShards {
                first: "r0".into(),
                second: "r1".into()
            }]
        );
    }

    #[test]
    fn test_nested_overlaps_all_reported() {
        let mut config = GateConfig::default();
        config.primary = primary();
        config.pools.push(replica("wide", Some([0, 10])));
        config.pools.push(replica("narrow-a", Some([2, 3])));
        config.pools.push(replica("narrow-b", Some([5, 6])));
        config.pools.push(replica("tail", Some([11, 12])));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::OverlappingShards {
                    first: "wide".into(),
                    second: "narrow-a".into()
                },
                ValidationError::OverlappingShards {
                    first: "wide".into(),
                    second: "narrow-b".into()
                },
            ]
        );
    }

    #[test]
    fn test_full_width_shard_range_is_accepted() {
        let mut config = GateConfig::default();
        config.primary = primary();
        config.pools.push(replica("r0", Some([0, u32::MAX])));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_replicas_require_primary() {
        let mut config = GateConfig::default();
        config.pools.push(replica("r0", None));
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingPrimary]);

        config.primary = primary();
        assert!(validate_config(&config).is_ok());
    }
}
