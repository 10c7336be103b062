//! Render session
//!
//! Drives one job through a borrowed engine:
//!
//! ```text
//! validate ─► open_context ─► load ─► wait_until_ready ─► export ─► normalize
//!                  │          └──────── ready_timeout ─┘   └ export_timeout
//!                  │                                              │
//!                  └──────────────► close (always, once) ◄────────┘
//! ```
//!
//! The session never touches pool bookkeeping. It reports whether the
//! engine is still trustworthy and the caller releases or retires the
//! worker accordingly.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::artifact::Artifact;
use crate::engine::{RenderContext, RenderEngine};
use crate::error::{RenderError, TimeoutStage};
use crate::job::RenderJob;

/// Time bounds for a render session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Bound on load plus readiness
    pub ready_timeout: Duration,
    /// Export bound when the job does not ask for a shorter one
    pub export_timeout: Duration,
    /// Bound on closing the context
    pub close_timeout: Duration,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(30),
            export_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(5),
        }
    }
}

impl RenderSettings {
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Export bound for a job; a per-job timeout can only shorten the default
    pub fn export_timeout_for(&self, job: &RenderJob) -> Duration {
        job.options
            .export_timeout()
            .map_or(self.export_timeout, |t| t.min(self.export_timeout))
    }
}

/// Result of a session plus the verdict on the engine it ran on
#[derive(Debug)]
pub struct SessionOutcome {
    pub result: Result<Artifact, RenderError>,
    /// False when the engine failed or its context could not be closed
    pub worker_healthy: bool,
}

/// Scoped execution of one job on one engine
pub struct RenderSession;

impl RenderSession {
    /// Run `job` on `engine`. The context opened for the job is closed
    /// before this returns, whatever the pipeline outcome.
    #[instrument(skip_all, fields(job_id = %job.id))]
    pub async fn run<E: RenderEngine>(
        engine: &E,
        job: &RenderJob,
        settings: &RenderSettings,
    ) -> SessionOutcome {
        if let Err(e) = job.validate() {
            return SessionOutcome {
                result: Err(e),
                worker_healthy: true,
            };
        }

        let mut context = match engine.open_context().await {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "Failed to open render context");
                return SessionOutcome {
                    result: Err(e.into()),
                    worker_healthy: false,
                };
            }
        };

        let started = Instant::now();
        let result = Self::pipeline(&mut context, job, settings).await;

        let closed = match tokio::time::timeout(settings.close_timeout, context.close()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to close render context");
                false
            }
            Err(_) => {
                warn!(
                    timeout_ms = settings.close_timeout.as_millis() as u64,
                    "Timed out closing render context"
                );
                false
            }
        };

        match &result {
            Ok(artifact) => debug!(
                bytes = artifact.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Render complete"
            ),
            Err(e) => debug!(kind = e.kind(), error = %e, "Render failed"),
        }

        let engine_failed = matches!(result, Err(RenderError::Engine(_)));
        SessionOutcome {
            result,
            worker_healthy: closed && !engine_failed,
        }
    }

    async fn pipeline<C: RenderContext>(
        context: &mut C,
        job: &RenderJob,
        settings: &RenderSettings,
    ) -> Result<Artifact, RenderError> {
        let load_started = Instant::now();
        let load = async {
            context.load(&job.content).await?;
            context.wait_until_ready().await
        };
        match tokio::time::timeout(settings.ready_timeout, load).await {
            Ok(loaded) => loaded?,
            Err(_) => {
                return Err(RenderError::Timeout {
                    stage: TimeoutStage::Load,
                    elapsed: load_started.elapsed(),
                })
            }
        }

        let export_started = Instant::now();
        let limit = settings.export_timeout_for(job);
        let output = match tokio::time::timeout(limit, context.export(&job.options)).await {
            Ok(output) => output?,
            Err(_) => {
                return Err(RenderError::Timeout {
                    stage: TimeoutStage::Export,
                    elapsed: export_started.elapsed(),
                })
            }
        };

        Ok(Artifact::normalize(output)?)
    }
}
