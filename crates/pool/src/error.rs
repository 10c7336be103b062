//! Pool errors

use std::time::Duration;

use thiserror::Error;

/// Errors returned by pool operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PoolError {
    /// No worker became available before the ticket's deadline
    #[error("timed out waiting for a worker after {waited:?}")]
    Timeout { waited: Duration },

    /// Drain has started; no new tickets are admitted
    #[error("pool is draining")]
    Draining,

    /// Drain has completed
    #[error("pool is closed")]
    Closed,

    /// The engine instance could not be created
    #[error("failed to create worker: {0}")]
    Create(String),

    /// Drain gave up waiting for busy workers
    #[error("drain timed out with {busy} busy worker(s)")]
    DrainTimeout { busy: usize },

    /// Invalid configuration
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
}

impl PoolError {
    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Create(_))
    }
}

/// Errors reported by a [`WorkerFactory`](crate::WorkerFactory)
#[derive(Debug, Clone, Error)]
pub enum FactoryError {
    /// Launching the engine failed
    #[error("launch failed: {0}")]
    Launch(String),

    /// Shutting the engine down failed
    #[error("shutdown failed: {0}")]
    Shutdown(String),
}
