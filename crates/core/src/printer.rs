// Printer: pool + render session
//
// The printer is the only place that pairs a borrowed worker with a render
// session. Sessions run on their own task so a caller that goes away (for
// example a disconnected HTTP client) cannot interrupt context teardown or
// the worker's return to the pool.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use printworks_pool::{Lease, Pool, PoolStatus, WorkerFactory};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::artifact::{Artifact, PDF_SIGNATURE};
use crate::engine::RenderEngine;
use crate::error::{EngineError, RenderError};
use crate::job::RenderJob;
use crate::session::{RenderSession, RenderSettings};

/// Fixed document rendered by the health probe
pub const PROBE_HTML: &str =
    "<!DOCTYPE html><html><head><title>probe</title></head><body><p>printworks health probe</p></body></html>";

/// Upper bound on how long the probe waits for a worker
pub const PROBE_ACQUIRE_LIMIT: Duration = Duration::from_secs(10);

/// Renders jobs on pooled engines
pub struct Printer<F>
where
    F: WorkerFactory,
    F::Instance: RenderEngine,
{
    pool: Pool<F>,
    settings: RenderSettings,
}

impl<F> Clone for Printer<F>
where
    F: WorkerFactory,
    F::Instance: RenderEngine,
{
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<F> Printer<F>
where
    F: WorkerFactory,
    F::Instance: RenderEngine,
{
    pub fn new(pool: Pool<F>, settings: RenderSettings) -> Self {
        Self { pool, settings }
    }

    pub fn pool(&self) -> &Pool<F> {
        &self.pool
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Render a job at `priority`, waiting up to the pool's acquire timeout
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    pub async fn print(&self, job: RenderJob, priority: u32) -> Result<Artifact, RenderError> {
        job.validate()?;

        let lease = self.pool.acquire_default(priority).await?;
        self.render_on(lease, job).await
    }

    /// Drive one synthetic job end to end and report per-component health.
    ///
    /// Uses ordinary acquire and release only, so the live worker count
    /// returns to its baseline afterwards.
    #[instrument(skip(self))]
    pub async fn probe(&self) -> HealthReport {
        let config = self.pool.config();
        let acquire_limit = config.acquire_timeout.min(PROBE_ACQUIRE_LIMIT);

        let lease = self
            .pool
            .acquire(config.highest_priority(), acquire_limit)
            .await;

        let (engine, render) = match lease {
            Ok(lease) => {
                let worker_id = lease.id();
                let engine = ComponentHealth::ok(json!({ "worker_id": worker_id }));
                let render = match self.render_on(lease, RenderJob::new(PROBE_HTML)).await {
                    Ok(artifact) if artifact.as_bytes().starts_with(PDF_SIGNATURE) => {
                        ComponentHealth::ok(json!({ "bytes": artifact.len() }))
                    }
                    Ok(_) => ComponentHealth::degraded(json!({ "error": "missing PDF signature" })),
                    Err(e) => ComponentHealth::degraded(json!({ "error": e.to_string(), "kind": e.kind() })),
                };
                (engine, render)
            }
            Err(e) => (
                ComponentHealth::degraded(json!({ "error": e.to_string() })),
                ComponentHealth::degraded(json!({ "error": "skipped: no worker available" })),
            ),
        };

        let stats = self.pool.stats();
        let pool_status = if stats.status == PoolStatus::Running {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        };
        let pool = ComponentHealth {
            status: pool_status,
            detail: serde_json::to_value(&stats).unwrap_or_default(),
        };

        let report = HealthReport::new(pool, engine, render);
        if report.status == HealthStatus::Degraded {
            warn!(
                pool = ?report.components.pool.status,
                engine = ?report.components.engine.status,
                render = ?report.components.render.status,
                "Health probe degraded"
            );
        }
        report
    }

    async fn render_on(&self, lease: Lease<F>, job: RenderJob) -> Result<Artifact, RenderError> {
        let settings = self.settings.clone();
        let worker_id = lease.id();

        let task = tokio::spawn(async move {
            let run = AssertUnwindSafe(RenderSession::run(&*lease, &job, &settings))
                .catch_unwind()
                .await;

            let outcome = match run {
                Ok(outcome) => outcome,
                Err(panic) => {
                    // The context was dropped mid-render; the engine cannot be trusted
                    let reason = format!("render panicked: {}", panic_message(&*panic));
                    error!(worker_id = %worker_id, job_id = %job.id, %reason, "Engine panicked");
                    lease.report_broken(reason.clone());
                    return Err(EngineError::Export(reason).into());
                }
            };

            if outcome.worker_healthy {
                lease.release();
            } else {
                let reason = match &outcome.result {
                    Err(e) => e.to_string(),
                    Ok(_) => "render context could not be closed".to_string(),
                };
                lease.report_broken(reason);
            }
            outcome.result
        });

        match task.await {
            Ok(result) => {
                if let Ok(artifact) = &result {
                    info!(worker_id = %worker_id, bytes = artifact.len(), "Document rendered");
                }
                result
            }
            Err(e) => Err(EngineError::Export(format!("render task failed: {}", e)).into()),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Overall or per-component health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub detail: serde_json::Value,
}

impl ComponentHealth {
    pub fn ok(detail: serde_json::Value) -> Self {
        Self {
            status: HealthStatus::Ok,
            detail,
        }
    }

    pub fn degraded(detail: serde_json::Value) -> Self {
        Self {
            status: HealthStatus::Degraded,
            detail,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthComponents {
    pub pool: ComponentHealth,
    pub engine: ComponentHealth,
    pub render: ComponentHealth,
}

/// Result of a health probe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub components: HealthComponents,
}

impl HealthReport {
    pub fn new(pool: ComponentHealth, engine: ComponentHealth, render: ComponentHealth) -> Self {
        let all_ok = [&pool, &engine, &render]
            .iter()
            .all(|c| c.status == HealthStatus::Ok);

        Self {
            status: if all_ok {
                HealthStatus::Ok
            } else {
                HealthStatus::Degraded
            },
            timestamp: Utc::now(),
            components: HealthComponents {
                pool,
                engine,
                render,
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}
