//! Exclusive worker leases

use std::fmt;
use std::ops::Deref;

use crate::factory::WorkerFactory;
use crate::pool::Pool;
use crate::worker::WorkerId;

/// How a worker comes back to the pool
pub(crate) enum Checkin {
    Healthy,
    Broken(String),
}

/// Exclusive hold on one worker's engine instance.
///
/// Dropping the lease releases the worker as healthy. Use
/// [`Lease::report_broken`] when the instance can no longer be trusted.
pub struct Lease<F: WorkerFactory> {
    id: WorkerId,
    instance: Option<F::Instance>,
    pool: Pool<F>,
}

impl<F: WorkerFactory> Lease<F> {
    pub(crate) fn new(id: WorkerId, instance: F::Instance, pool: Pool<F>) -> Self {
        Self {
            id,
            instance: Some(instance),
            pool,
        }
    }

    /// Worker holding this lease
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Return the worker to the pool
    pub fn release(self) {
        drop(self);
    }

    /// Return the worker for destruction; a replacement is created on demand
    pub fn report_broken(mut self, reason: impl Into<String>) {
        if let Some(instance) = self.instance.take() {
            self.pool
                .checkin(self.id, instance, Checkin::Broken(reason.into()));
        }
    }
}

impl<F: WorkerFactory> Deref for Lease<F> {
    type Target = F::Instance;

    fn deref(&self) -> &Self::Target {
        match &self.instance {
            Some(instance) => instance,
            None => unreachable!("lease instance is only taken on consumption"),
        }
    }
}

impl<F: WorkerFactory> Drop for Lease<F> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            self.pool.checkin(self.id, instance, Checkin::Healthy);
        }
    }
}

impl<F: WorkerFactory> fmt::Debug for Lease<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("worker_id", &self.id).finish()
    }
}
