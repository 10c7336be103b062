//! Pool manager
//!
//! All bookkeeping lives behind one mutex and no `.await` happens while it
//! is held. Every operation computes its side effects under the lock and
//! applies them afterwards: resolving tickets, spawning engine creation,
//! spawning engine destruction.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, error, info, instrument, warn};

use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::factory::WorkerFactory;
use crate::lease::{Checkin, Lease};
use crate::stats::{PoolStats, PoolStatus};
use crate::ticket::{Ticket, TicketKey, TicketQueue};
use crate::worker::{WorkerId, WorkerRecord, WorkerState};

type Outcome<F> = Result<Lease<F>, PoolError>;

/// Bounded pool of engine workers with a priority wait queue.
///
/// Cloning is cheap; every clone refers to the same pool.
///
/// # Example
///
/// ```ignore
/// use printworks_pool::{Pool, PoolConfig};
///
/// let pool = Pool::new(factory, PoolConfig::default().with_max_workers(2))?;
///
/// let lease = pool.acquire_default(1).await?;
/// // ... use &*lease
/// lease.release();
///
/// pool.drain().await?;
/// ```
pub struct Pool<F: WorkerFactory> {
    inner: Arc<Inner<F>>,
}

impl<F: WorkerFactory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<F: WorkerFactory> {
    factory: Arc<F>,
    config: PoolConfig,
    state: Mutex<PoolState<F>>,
    changed: Notify,
}

struct PoolState<F: WorkerFactory> {
    status: PoolStatus,
    workers: HashMap<WorkerId, WorkerRecord>,
    /// Most recently used on top
    idle: Vec<(WorkerId, F::Instance)>,
    queue: TicketQueue<Outcome<F>>,
    counters: Counters,
}

#[derive(Debug, Default, Clone)]
struct Counters {
    created: u64,
    destroyed: u64,
    creation_failures: u64,
    consecutive_creation_failures: u64,
    last_creation_error: Option<String>,
    timeouts: u64,
    handoffs: u64,
}

impl<F: WorkerFactory> PoolState<F> {
    fn count(&self, state: WorkerState) -> usize {
        self.workers.values().filter(|w| w.state == state).count()
    }

    fn set_state(&mut self, id: WorkerId, state: WorkerState) {
        if let Some(record) = self.workers.get_mut(&id) {
            debug!(worker_id = %id, from = %record.state, to = %state, "Worker state change");
            record.state = state;
        }
    }
}

/// Deferred side effect, applied after the lock is released
enum Effect<F: WorkerFactory> {
    Hand(Ticket<Outcome<F>>, Lease<F>),
    Reject(Ticket<Outcome<F>>, PoolError),
    Create(WorkerId, Option<TicketKey>),
    Destroy(WorkerId, F::Instance),
}

impl<F: WorkerFactory> Pool<F> {
    /// Create an empty pool. Workers are created lazily on demand.
    pub fn new(factory: F, config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        info!(
            max_workers = config.max_workers,
            priority_levels = config.priority_levels,
            acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
            "Creating worker pool"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                factory: Arc::new(factory),
                config,
                state: Mutex::new(PoolState {
                    status: PoolStatus::Running,
                    workers: HashMap::new(),
                    idle: Vec::new(),
                    queue: TicketQueue::default(),
                    counters: Counters::default(),
                }),
                changed: Notify::new(),
            }),
        })
    }

    /// Pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Current status
    pub fn status(&self) -> PoolStatus {
        self.inner.state.lock().status
    }

    /// Number of workers in any state
    pub fn live_workers(&self) -> usize {
        self.inner.state.lock().workers.len()
    }

    /// Point-in-time snapshot of the pool
    pub fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock();
        let counters = &state.counters;

        PoolStats {
            status: state.status,
            max_workers: self.inner.config.max_workers,
            live: state.workers.len(),
            initializing: state.count(WorkerState::Initializing),
            idle: state.count(WorkerState::Idle),
            busy: state.count(WorkerState::Busy),
            retiring: state.count(WorkerState::Broken) + state.count(WorkerState::Destroying),
            waiting: state.queue.len(),
            created_total: counters.created,
            destroyed_total: counters.destroyed,
            creation_failures: counters.creation_failures,
            consecutive_creation_failures: counters.consecutive_creation_failures,
            last_creation_error: counters.last_creation_error.clone(),
            timeouts: counters.timeouts,
            handoffs: counters.handoffs,
        }
    }

    /// Acquire a worker using the configured acquire timeout
    pub async fn acquire_default(&self, priority: u32) -> Result<Lease<F>, PoolError> {
        self.acquire(priority, self.inner.config.acquire_timeout)
            .await
    }

    /// Acquire a worker.
    ///
    /// Returns an idle worker immediately when one exists. Otherwise the
    /// caller waits on a ticket, served by priority (larger first) then
    /// arrival, until a worker is handed over or `timeout` elapses. A free
    /// slot below the cap starts creating a new worker for the queue.
    #[instrument(skip(self, timeout))]
    pub async fn acquire(&self, priority: u32, timeout: Duration) -> Result<Lease<F>, PoolError> {
        let priority = self.inner.config.clamp_priority(priority);

        let (tx, mut rx) = oneshot::channel();

        let (key, effects) = {
            let mut state = self.inner.state.lock();
            match state.status {
                PoolStatus::Running => {}
                PoolStatus::Draining => return Err(PoolError::Draining),
                PoolStatus::Closed => return Err(PoolError::Closed),
            }

            if state.queue.is_empty() {
                if let Some((id, instance)) = state.idle.pop() {
                    state.set_state(id, WorkerState::Busy);
                    if let Some(record) = state.workers.get_mut(&id) {
                        record.last_used_at = Instant::now();
                    }
                    debug!(worker_id = %id, "Acquired idle worker");
                    return Ok(Lease::new(id, instance, self.clone()));
                }
            }

            let key = state.queue.push(priority, tx);
            let effects = self.fill_slots(&mut state, Some(key));
            debug!(waiting = state.queue.len(), "Enqueued acquisition ticket");
            (key, effects)
        };
        self.apply(effects);

        let enqueued_at = Instant::now();
        let mut guard = TicketGuard {
            pool: self,
            key: Some(key),
        };

        let received = match tokio::time::timeout(timeout, &mut rx).await {
            Ok(received) => received,
            Err(_) => {
                let expired = {
                    let mut state = self.inner.state.lock();
                    let expired = state.queue.remove(&key);
                    if expired.is_some() {
                        state.counters.timeouts += 1;
                    }
                    expired
                };
                guard.key = None;

                if expired.is_some() {
                    self.inner.changed.notify_waiters();
                    let waited = enqueued_at.elapsed();
                    warn!(waited_ms = waited.as_millis() as u64, "Timed out waiting for worker");
                    return Err(PoolError::Timeout { waited });
                }

                // Resolution won the race; the outcome is in flight
                rx.await
            }
        };
        guard.key = None;

        match received {
            Ok(outcome) => {
                if let Ok(lease) = &outcome {
                    debug!(
                        worker_id = %lease.id(),
                        waited_ms = enqueued_at.elapsed().as_millis() as u64,
                        "Ticket resolved"
                    );
                }
                outcome
            }
            Err(_) => Err(PoolError::Closed),
        }
    }

    /// Return a healthy worker. Same as dropping the lease.
    pub fn release(&self, lease: Lease<F>) {
        lease.release();
    }

    /// Retire a worker that can no longer be trusted
    pub fn report_broken(&self, lease: Lease<F>, reason: impl Into<String>) {
        lease.report_broken(reason);
    }

    /// Stop admitting new tickets, wait out in-flight work, destroy every worker.
    ///
    /// Tickets queued before the drain began are still served. Workers
    /// already being destroyed are waited for too, so a successful drain
    /// leaves no live worker. Calling `drain` on a closed pool is a no-op.
    #[instrument(skip(self))]
    pub async fn drain(&self) -> Result<(), PoolError> {
        {
            let mut state = self.inner.state.lock();
            match state.status {
                PoolStatus::Closed => return Ok(()),
                PoolStatus::Draining => {}
                PoolStatus::Running => {
                    state.status = PoolStatus::Draining;
                    info!(
                        live = state.workers.len(),
                        waiting = state.queue.len(),
                        "Draining worker pool"
                    );
                }
            }
        }
        self.inner.changed.notify_waiters();

        let deadline = tokio::time::Instant::now() + self.inner.config.drain_timeout;
        let mut stuck = None;

        loop {
            let notified = self.inner.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            // Busy, initializing and retiring workers all hold a slot until
            // their task finishes
            let (in_flight, waiting) = {
                let state = self.inner.state.lock();
                (state.workers.len() - state.idle.len(), state.queue.len())
            };
            if in_flight == 0 && waiting == 0 {
                break;
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                warn!(in_flight, waiting, "Drain timeout reached");
                stuck = Some(in_flight);
                break;
            }
        }

        let (idle, abandoned) = {
            let mut state = self.inner.state.lock();
            if state.status == PoolStatus::Closed {
                return Ok(());
            }
            state.status = PoolStatus::Closed;

            let idle = std::mem::take(&mut state.idle);
            for (id, _) in &idle {
                state.set_state(*id, WorkerState::Destroying);
            }
            (idle, state.queue.take_all())
        };

        for ticket in abandoned {
            let _ = ticket.resolve(Err(PoolError::Closed));
        }

        futures::future::join_all(
            idle.into_iter()
                .map(|(id, instance)| self.destroy_worker(id, instance)),
        )
        .await;
        self.inner.changed.notify_waiters();

        match stuck {
            Some(busy) => Err(PoolError::DrainTimeout { busy }),
            None => {
                info!("Worker pool drained");
                Ok(())
            }
        }
    }

    /// Return a worker from a lease
    pub(crate) fn checkin(&self, id: WorkerId, instance: F::Instance, checkin: Checkin) {
        let effects = {
            let mut state = self.inner.state.lock();
            let config = &self.inner.config;
            let closed = state.status == PoolStatus::Closed;

            let retire = match state.workers.get_mut(&id) {
                Some(record) => {
                    record.uses += 1;
                    record.last_used_at = Instant::now();
                    closed
                        || record.is_due_for_retirement(
                            config.max_worker_uses,
                            config.max_worker_age,
                        )
                }
                None => {
                    error!(worker_id = %id, "Checked in a worker the pool does not know");
                    true
                }
            };

            match checkin {
                Checkin::Broken(reason) => {
                    warn!(worker_id = %id, %reason, "Worker reported broken");
                    state.set_state(id, WorkerState::Broken);
                    vec![Effect::Destroy(id, instance)]
                }
                Checkin::Healthy if retire => {
                    debug!(worker_id = %id, closed, "Retiring worker");
                    state.set_state(id, WorkerState::Destroying);
                    vec![Effect::Destroy(id, instance)]
                }
                Checkin::Healthy => {
                    let effects = self.dispatch(&mut state, id, instance);
                    if matches!(effects.first(), Some(Effect::Hand(..))) {
                        state.counters.handoffs += 1;
                    }
                    effects
                }
            }
        };

        self.apply(effects);
        self.inner.changed.notify_waiters();
    }

    /// Give a worker to the head ticket, or park it as idle
    fn dispatch(
        &self,
        state: &mut PoolState<F>,
        id: WorkerId,
        instance: F::Instance,
    ) -> Vec<Effect<F>> {
        match state.queue.pop() {
            Some((key, ticket)) => {
                state.set_state(id, WorkerState::Busy);
                debug!(
                    worker_id = %id,
                    priority = key.priority(),
                    queued_ms = ticket.enqueued_at.elapsed().as_millis() as u64,
                    "Handing worker to waiting ticket"
                );
                vec![Effect::Hand(ticket, Lease::new(id, instance, self.clone()))]
            }
            None => {
                state.set_state(id, WorkerState::Idle);
                state.idle.push((id, instance));
                Vec::new()
            }
        }
    }

    /// Reserve slots for waiting tickets that no creation is covering yet
    fn fill_slots(&self, state: &mut PoolState<F>, sponsor: Option<TicketKey>) -> Vec<Effect<F>> {
        let mut effects = Vec::new();
        let mut sponsor = sponsor;

        while state.status != PoolStatus::Closed
            && state.queue.len() > state.count(WorkerState::Initializing)
            && state.workers.len() < self.inner.config.max_workers
        {
            let id = WorkerId::new();
            state.workers.insert(id, WorkerRecord::initializing(id));
            effects.push(Effect::Create(id, sponsor.take()));
        }

        effects
    }

    fn apply(&self, effects: Vec<Effect<F>>) {
        for effect in effects {
            match effect {
                Effect::Hand(ticket, lease) => {
                    // A vanished waiter hands the lease back; dropping it re-dispatches
                    let _ = ticket.resolve(Ok(lease));
                }
                Effect::Reject(ticket, error) => {
                    let _ = ticket.resolve(Err(error));
                }
                Effect::Create(id, sponsor) => self.spawn_create(id, sponsor),
                Effect::Destroy(id, instance) => self.spawn_destroy(id, instance),
            }
        }
    }

    fn spawn_create(&self, id: WorkerId, sponsor: Option<TicketKey>) {
        let pool = self.clone();
        let task = async move {
            let limit = pool.inner.config.create_timeout;
            debug!(worker_id = %id, "Creating worker");

            let created = match tokio::time::timeout(limit, pool.inner.factory.create(id)).await {
                Ok(Ok(instance)) => Ok(instance),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("creation timed out after {:?}", limit)),
            };

            match created {
                Ok(instance) => pool.admit(id, instance),
                Err(message) => pool.creation_failed(id, sponsor, message),
            }
        };

        if !spawn(task) {
            self.creation_failed(id, sponsor, "no async runtime available".to_string());
        }
    }

    fn admit(&self, id: WorkerId, instance: F::Instance) {
        let effects = {
            let mut state = self.inner.state.lock();
            state.counters.created += 1;
            state.counters.consecutive_creation_failures = 0;
            info!(worker_id = %id, live = state.workers.len(), "Worker created");

            if state.status == PoolStatus::Closed {
                state.set_state(id, WorkerState::Destroying);
                vec![Effect::Destroy(id, instance)]
            } else {
                self.dispatch(&mut state, id, instance)
            }
        };

        self.apply(effects);
        self.inner.changed.notify_waiters();
    }

    fn creation_failed(&self, id: WorkerId, sponsor: Option<TicketKey>, message: String) {
        let effects = {
            let mut state = self.inner.state.lock();
            state.workers.remove(&id);
            state.counters.creation_failures += 1;
            state.counters.consecutive_creation_failures += 1;
            state.counters.last_creation_error = Some(message.clone());
            error!(worker_id = %id, error = %message, "Failed to create worker");

            // Report to the ticket that asked for this worker. If it is gone,
            // reject the head only when nothing else is coming for it, so a
            // failing engine cannot spin without consuming tickets.
            let rejected = match sponsor.and_then(|key| state.queue.remove(&key)) {
                Some(ticket) => Some(ticket),
                None if state.queue.len() > state.count(WorkerState::Initializing) => {
                    state.queue.pop().map(|(_, ticket)| ticket)
                }
                None => None,
            };

            let mut effects = Vec::new();
            if let Some(ticket) = rejected {
                effects.push(Effect::Reject(ticket, PoolError::Create(message)));
            }
            effects.extend(self.fill_slots(&mut state, None));
            effects
        };

        self.apply(effects);
        self.inner.changed.notify_waiters();
    }

    fn spawn_destroy(&self, id: WorkerId, instance: F::Instance) {
        let pool = self.clone();
        if let Err(task) = try_spawn(async move { pool.destroy_worker(id, instance).await }) {
            // Dropping the task drops the instance
            drop(task);
            self.forget(id);
        }
    }

    async fn destroy_worker(&self, id: WorkerId, instance: F::Instance) {
        self.inner.state.lock().set_state(id, WorkerState::Destroying);

        let limit = self.inner.config.destroy_timeout;
        match tokio::time::timeout(limit, self.inner.factory.destroy(id, instance)).await {
            Ok(Ok(())) => debug!(worker_id = %id, "Worker destroyed"),
            Ok(Err(e)) => warn!(worker_id = %id, error = %e, "Worker destroy failed"),
            Err(_) => warn!(worker_id = %id, timeout_ms = limit.as_millis() as u64, "Worker destroy timed out"),
        }

        self.forget(id);
    }

    /// Drop a worker's bookkeeping and refill its slot for waiting tickets
    fn forget(&self, id: WorkerId) {
        let effects = {
            let mut state = self.inner.state.lock();
            if state.workers.remove(&id).is_some() {
                state.counters.destroyed += 1;
            }
            self.fill_slots(&mut state, None)
        };

        self.apply(effects);
        self.inner.changed.notify_waiters();
    }
}

/// Removes a still-queued ticket when the waiting caller goes away
struct TicketGuard<'a, F: WorkerFactory> {
    pool: &'a Pool<F>,
    key: Option<TicketKey>,
}

impl<F: WorkerFactory> Drop for TicketGuard<'_, F> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            let cancelled = self.pool.inner.state.lock().queue.remove(&key);
            if cancelled.is_some() {
                debug!(priority = key.priority(), "Acquisition cancelled");
                self.pool.inner.changed.notify_waiters();
            }
        }
    }
}

fn spawn<Fut>(task: Fut) -> bool
where
    Fut: Future<Output = ()> + Send + 'static,
{
    try_spawn(task).is_ok()
}

fn try_spawn<Fut>(task: Fut) -> Result<(), Fut>
where
    Fut: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
            Ok(())
        }
        Err(_) => Err(task),
    }
}
