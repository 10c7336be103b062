//! Engine factory seam

use async_trait::async_trait;

use crate::error::FactoryError;
use crate::worker::WorkerId;

/// Creates and destroys the engine instances a pool manages.
///
/// Both methods run on background tasks, never under the pool lock.
#[async_trait]
pub trait WorkerFactory: Send + Sync + 'static {
    /// One live engine instance
    type Instance: Send + Sync + 'static;

    /// Start a new instance for the worker `id`
    async fn create(&self, id: WorkerId) -> Result<Self::Instance, FactoryError>;

    /// Shut an instance down and release its resources
    async fn destroy(&self, id: WorkerId, instance: Self::Instance) -> Result<(), FactoryError>;
}
