//! Pool configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Worker pool configuration
///
/// # Example
///
/// ```
/// use printworks_pool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::default()
///     .with_max_workers(4)
///     .with_acquire_timeout(Duration::from_secs(30))
///     .with_priority_levels(3);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolConfig {
    /// Maximum number of live workers, counting every state
    pub max_workers: usize,

    /// Default bound on how long `acquire` may wait
    #[serde(with = "duration_millis")]
    pub acquire_timeout: Duration,

    /// Number of priority levels; valid priorities are `0..priority_levels`
    /// and a larger number is served first
    pub priority_levels: u32,

    /// Bound on a single engine creation
    #[serde(with = "duration_millis")]
    pub create_timeout: Duration,

    /// Bound on a single engine destruction
    #[serde(with = "duration_millis")]
    pub destroy_timeout: Duration,

    /// How long `drain` waits for busy workers before giving up
    #[serde(with = "duration_millis")]
    pub drain_timeout: Duration,

    /// Retire a worker after this many jobs (None = never)
    pub max_worker_uses: Option<u32>,

    /// Retire a worker once it is older than this (None = never)
    #[serde(with = "option_duration_millis")]
    pub max_worker_age: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            acquire_timeout: Duration::from_secs(120),
            priority_levels: 3,
            create_timeout: Duration::from_secs(30),
            destroy_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(30),
            max_worker_uses: None,
            max_worker_age: None,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker cap
    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max;
        self
    }

    /// Set the default acquire timeout
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the number of priority levels
    pub fn with_priority_levels(mut self, levels: u32) -> Self {
        self.priority_levels = levels;
        self
    }

    /// Set the creation timeout
    pub fn with_create_timeout(mut self, timeout: Duration) -> Self {
        self.create_timeout = timeout;
        self
    }

    /// Set the destruction timeout
    pub fn with_destroy_timeout(mut self, timeout: Duration) -> Self {
        self.destroy_timeout = timeout;
        self
    }

    /// Set the drain timeout
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Retire workers after `uses` jobs
    pub fn with_max_worker_uses(mut self, uses: u32) -> Self {
        self.max_worker_uses = Some(uses.max(1));
        self
    }

    /// Retire workers older than `age`
    pub fn with_max_worker_age(mut self, age: Duration) -> Self {
        self.max_worker_age = Some(age);
        self
    }

    /// Highest valid priority
    pub fn highest_priority(&self) -> u32 {
        self.priority_levels.saturating_sub(1)
    }

    /// Middle priority, used when a caller does not ask for one
    pub fn default_priority(&self) -> u32 {
        self.priority_levels / 2
    }

    /// Clamp a requested priority into the configured range
    pub fn clamp_priority(&self, priority: u32) -> u32 {
        priority.min(self.highest_priority())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_workers == 0 {
            return Err(PoolError::InvalidConfig(
                "max_workers must be at least 1".into(),
            ));
        }
        if self.priority_levels == 0 {
            return Err(PoolError::InvalidConfig(
                "priority_levels must be at least 1".into(),
            ));
        }
        if self.acquire_timeout.is_zero() {
            return Err(PoolError::InvalidConfig(
                "acquire_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Serde support for Option<Duration> as milliseconds
mod option_duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration
            .map(|d| d.as_millis() as u64)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
