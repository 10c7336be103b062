//! Pool status and statistics snapshots

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pool lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    /// Accepting new tickets
    Running,
    /// Rejecting new tickets, finishing in-flight work
    Draining,
    /// Every worker destroyed
    Closed,
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Point-in-time view of the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub status: PoolStatus,
    pub max_workers: usize,
    /// Workers in any state
    pub live: usize,
    pub initializing: usize,
    pub idle: usize,
    pub busy: usize,
    /// Broken or destroying
    pub retiring: usize,
    /// Tickets in the wait queue
    pub waiting: usize,
    pub created_total: u64,
    pub destroyed_total: u64,
    pub creation_failures: u64,
    /// Failures since the last successful creation
    pub consecutive_creation_failures: u64,
    pub last_creation_error: Option<String>,
    pub timeouts: u64,
    /// Released workers passed straight to a waiting ticket
    pub handoffs: u64,
}

impl PoolStats {
    /// Slots still available for new workers
    pub fn free_slots(&self) -> usize {
        self.max_workers.saturating_sub(self.live)
    }
}
