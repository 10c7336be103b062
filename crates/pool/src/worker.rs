//! Worker records and lifecycle states

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Worker identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(Uuid);

impl WorkerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for WorkerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a worker
///
/// ```text
/// Initializing ──► Idle ◄──► Busy ──► Broken ──► Destroying ──► (removed)
///       │                      │                     ▲
///       └── creation failed    └── retired/closed ───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Engine instance is being created
    Initializing,
    /// Available for a ticket
    Idle,
    /// Held by exactly one lease
    Busy,
    /// Reported untrustworthy; awaiting destruction
    Broken,
    /// Engine instance is being shut down
    Destroying,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
            Self::Broken => write!(f, "broken"),
            Self::Destroying => write!(f, "destroying"),
        }
    }
}

/// Bookkeeping for one worker. The engine instance itself lives either in
/// the idle stack or inside a lease, never here.
#[derive(Debug, Clone)]
pub(crate) struct WorkerRecord {
    pub id: WorkerId,
    pub state: WorkerState,
    pub created_at: Instant,
    pub last_used_at: Instant,
    pub uses: u32,
}

impl WorkerRecord {
    pub fn initializing(id: WorkerId) -> Self {
        let now = Instant::now();
        Self {
            id,
            state: WorkerState::Initializing,
            created_at: now,
            last_used_at: now,
            uses: 0,
        }
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether the worker has outlived the configured use or age bounds
    pub fn is_due_for_retirement(
        &self,
        max_uses: Option<u32>,
        max_age: Option<Duration>,
    ) -> bool {
        max_uses.is_some_and(|max| self.uses >= max) || max_age.is_some_and(|max| self.age() >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_initializing() {
        let record = WorkerRecord::initializing(WorkerId::new());
        assert_eq!(record.state, WorkerState::Initializing);
        assert_eq!(record.uses, 0);
    }

    #[test]
    fn test_retirement_by_uses() {
        let mut record = WorkerRecord::initializing(WorkerId::new());
        assert!(!record.is_due_for_retirement(Some(2), None));
        record.uses = 2;
        assert!(record.is_due_for_retirement(Some(2), None));
        assert!(!record.is_due_for_retirement(None, None));
    }

    #[test]
    fn test_retirement_by_age() {
        let record = WorkerRecord::initializing(WorkerId::new());
        assert!(record.is_due_for_retirement(None, Some(Duration::ZERO)));
        assert!(!record.is_due_for_retirement(None, Some(Duration::from_secs(3600))));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(WorkerState::Idle.to_string(), "idle");
        assert_eq!(WorkerState::Destroying.to_string(), "destroying");
    }

    #[test]
    fn test_worker_ids_are_unique() {
        assert_ne!(WorkerId::new(), WorkerId::new());
    }
}
