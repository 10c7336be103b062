// Engine traits
//
// A worker's pooled instance implements `RenderEngine`. Each job opens one
// ephemeral `RenderContext` on it (a browser page, for Chromium), drives it
// through load, readiness and export, then closes it.

use async_trait::async_trait;

use crate::artifact::EngineOutput;
use crate::error::EngineError;
use crate::options::RenderOptions;

/// A live rendering engine instance
#[async_trait]
pub trait RenderEngine: Send + Sync + 'static {
    type Context: RenderContext;

    /// Open a fresh context isolated from previous jobs
    async fn open_context(&self) -> Result<Self::Context, EngineError>;
}

/// One job's ephemeral context on an engine
#[async_trait]
pub trait RenderContext: Send {
    /// Load markup into the context
    async fn load(&mut self, content: &str) -> Result<(), EngineError>;

    /// Resolve once the loaded content has settled (document and fonts loaded).
    /// Callers bound this with a timeout.
    async fn wait_until_ready(&mut self) -> Result<(), EngineError>;

    /// Export the loaded document
    async fn export(&mut self, options: &RenderOptions) -> Result<EngineOutput, EngineError>;

    /// Dispose of the context. Called exactly once per opened context.
    async fn close(&mut self) -> Result<(), EngineError>;
}
