// Error types for the render pipeline

use std::fmt;
use std::time::Duration;

use printworks_pool::PoolError;
use thiserror::Error;

use crate::options::OptionsError;

/// Errors raised by a rendering engine or one of its contexts
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The engine process could not be started
    #[error("engine launch failed: {0}")]
    Launch(String),

    /// Opening a fresh render context failed
    #[error("failed to open render context: {0}")]
    OpenContext(String),

    /// The content could not be loaded into the context
    #[error("failed to load content: {0}")]
    Load(String),

    /// The engine failed while exporting the document
    #[error("export failed: {0}")]
    Export(String),

    /// The engine returned output that is not a single document
    #[error("malformed engine output: {0}")]
    MalformedOutput(String),

    /// Closing the render context failed
    #[error("failed to close render context: {0}")]
    Close(String),
}

impl EngineError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        EngineError::MalformedOutput(msg.into())
    }
}

/// Render pipeline stage that exceeded its time bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStage {
    /// Waiting for a worker in the pool queue
    PoolWait,
    /// Loading content and waiting for readiness
    Load,
    /// Exporting the document
    Export,
}

impl fmt::Display for TimeoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolWait => write!(f, "waiting for a worker"),
            Self::Load => write!(f, "loading content"),
            Self::Export => write!(f, "exporting document"),
        }
    }
}

/// Errors surfaced by a render job
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderError {
    /// Bad input; never retried
    #[error("{0}")]
    Validation(String),

    /// A stage exceeded its bound; safe to retry
    #[error("timed out {stage} after {elapsed:?}")]
    Timeout {
        stage: TimeoutStage,
        elapsed: Duration,
    },

    /// The engine failed or produced unusable output
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The pool is not accepting work (draining, closed, or unable to start an engine)
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl RenderError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        RenderError::Validation(msg.into())
    }

    /// Whether a client may reasonably retry the same job
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Unavailable(_))
    }

    /// Stable machine-readable kind, used in error bodies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Timeout { .. } => "timeout",
            Self::Engine(_) => "engine",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl From<OptionsError> for RenderError {
    fn from(e: OptionsError) -> Self {
        RenderError::Validation(e.to_string())
    }
}

impl From<PoolError> for RenderError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Timeout { waited } => RenderError::Timeout {
                stage: TimeoutStage::PoolWait,
                elapsed: waited,
            },
            other => RenderError::Unavailable(other.to_string()),
        }
    }
}
