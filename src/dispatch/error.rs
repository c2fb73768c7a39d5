//! Dispatch error taxonomy.
//!
//! Only three errors ever reach the caller: [`DispatchError::PoolUnavailable`]
//! (not configured, do not retry), and [`DispatchError::RateLimited`] /
//! [`DispatchError::PoolExhausted`] (try again later). Per-attempt failures
//! are [`AttemptError`]s, absorbed by the retry loop and only surfaced as the
//! last error inside `PoolExhausted`.

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

use crate::config::ServiceClass;
use crate::registry::NoPoolAvailable;
use crate::resilience::CircuitOpenError;

/// Boxed error returned by a caller-supplied downstream function.
pub type DownstreamError = Box<dyn StdError + Send + Sync + 'static>;

/// Why a single attempt against one pool failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The pool's breaker rejected the call; downstream was not invoked.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// The downstream function returned an error.
    #[error("downstream error from pool '{pool}': {source}")]
    Downstream {
        pool: String,
        #[source]
        source: DownstreamError,
    },

    /// The dispatch deadline expired while the downstream call was running.
    #[error("deadline elapsed while calling pool '{pool}'")]
    DeadlineElapsed { pool: String },
}

impl AttemptError {
    /// Pool the attempt was made against.
    pub fn pool(&self) -> &str {
        match self {
            AttemptError::CircuitOpen(e) => &e.pool,
            AttemptError::Downstream { pool, .. } => pool,
            AttemptError::DeadlineElapsed { pool } => pool,
        }
    }

    /// Metric label for this failure.
    pub fn outcome(&self) -> &'static str {
        match self {
            AttemptError::CircuitOpen(_) => "circuit_open",
            AttemptError::Downstream { .. } => "downstream_error",
            AttemptError::DeadlineElapsed { .. } => "deadline",
        }
    }
}

/// Error returned by [`crate::dispatch::ResilientInvoker::dispatch`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No pool configured or eligible for the class. Fatal, not retried.
    #[error("no pool available for service class '{class}'")]
    PoolUnavailable { class: ServiceClass },

    /// The deadline ran out while waiting for a rate-limit token.
    #[error("rate limited on pool '{pool}' ({class}): deadline exhausted waiting {waited:?} for a token")]
    RateLimited {
        class: ServiceClass,
        pool: String,
        waited: Duration,
    },

    /// Every attempt failed or the deadline ran out.
    #[error("{class} pools exhausted after {} attempt(s) on [{}]", .pools_tried.len(), .pools_tried.join(", "))]
    PoolExhausted {
        class: ServiceClass,
        pools_tried: Vec<String>,
        #[source]
        last_error: Option<AttemptError>,
    },
}

impl DispatchError {
    /// True for "try again later", false for "not configured".
    pub fn is_retryable(&self) -> bool {
        !matches!(self, DispatchError::PoolUnavailable { .. })
    }

    /// Metric label for this error.
    pub fn outcome(&self) -> &'static str {
        match self {
            DispatchError::PoolUnavailable { .. } => "pool_unavailable",
            DispatchError::RateLimited { .. } => "rate_limited",
            DispatchError::PoolExhausted { .. } => "exhausted",
        }
    }
}

impl From<NoPoolAvailable> for DispatchError {
    fn from(e: NoPoolAvailable) -> Self {
        DispatchError::PoolUnavailable { class: e.class }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitState;

    #[test]
    fn test_retryable_classification() {
        let unavailable = DispatchError::from(NoPoolAvailable { class: ServiceClass::Ai });
        assert!(!unavailable.is_retryable());

        let limited = DispatchError::RateLimited {
            class: ServiceClass::Ai,
            pool: "ai-0".into(),
            waited: Duration::from_millis(5),
        };
        assert!(limited.is_retryable());

        let exhausted = DispatchError::PoolExhausted {
            class: ServiceClass::Messaging,
            pools_tried: vec!["a".into(), "b".into()],
            last_error: None,
        };
        assert!(exhausted.is_retryable());
        assert_eq!(exhausted.to_string(), "messaging pools exhausted after 2 attempt(s) on [a, b]");
    }

    #[test]
    fn test_exhausted_exposes_last_error_as_source() {
        let last = AttemptError::CircuitOpen(CircuitOpenError {
            pool: "b".into(),
            state: CircuitState::Open,
            retry_in: Duration::from_secs(1),
        });
        let err = DispatchError::PoolExhausted {
            class: ServiceClass::Ai,
            pools_tried: vec!["a".into(), "b".into()],
            last_error: Some(last),
        };
        let source = StdError::source(&err).unwrap();
        assert!(source.to_string().contains("circuit open for pool 'b'"));
    }
}
