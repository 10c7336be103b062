// Document service seam
//
// Handlers only see this trait. The production implementation is a
// `Printer` over Chromium workers; tests plug in a `Printer` over the
// scripted mock engine.

use async_trait::async_trait;
use printworks_core::{Artifact, HealthReport, Printer, RenderEngine, RenderError, RenderJob};
use printworks_pool::WorkerFactory;

#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Render a job; `None` uses the pool's default priority
    async fn print(&self, job: RenderJob, priority: Option<u32>) -> Result<Artifact, RenderError>;

    /// Deep health check through pool, engine and render pipeline
    async fn probe(&self) -> HealthReport;
}

#[async_trait]
impl<F> DocumentService for Printer<F>
where
    F: WorkerFactory,
    F::Instance: RenderEngine,
{
    async fn print(&self, job: RenderJob, priority: Option<u32>) -> Result<Artifact, RenderError> {
        let priority = priority.unwrap_or_else(|| self.pool().config().default_priority());
        Printer::print(self, job, priority).await
    }

    async fn probe(&self) -> HealthReport {
        Printer::probe(self).await
    }
}
