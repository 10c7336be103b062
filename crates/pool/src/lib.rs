//! # Printworks Worker Pool
//!
//! A bounded pool of long-lived, expensive engine instances (headless
//! browsers) shared by many concurrent callers.
//!
//! ## Features
//!
//! - **Bounded concurrency**: never more than `max_workers` live instances, counting every state
//! - **Priority wait queue**: larger priority first, FIFO within a level
//! - **Direct handoff**: a released worker goes straight to the next waiting ticket
//! - **Self-healing**: broken workers are destroyed and replaced on demand
//! - **Graceful drain**: queued work finishes, then every instance is shut down
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Pool::acquire                         │
//! │   idle worker? ──yes──► Lease (Busy)                         │
//! │        │ no                                                  │
//! │        ▼                                                     │
//! │   TicketQueue (priority desc, arrival asc)                   │
//! │        │                     ▲                               │
//! │        │ free slot           │ release / creation done       │
//! │        ▼                     │                               │
//! │   WorkerFactory::create ─────┘                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   Lease drop ──► next ticket | idle stack | destroy          │
//! │   report_broken ──► WorkerFactory::destroy ──► slot freed    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use printworks_pool::prelude::*;
//!
//! let pool = Pool::new(MyFactory, PoolConfig::default().with_max_workers(4))?;
//!
//! let lease = pool.acquire(2, Duration::from_secs(5)).await?;
//! match do_work(&lease).await {
//!     Ok(_) => lease.release(),
//!     Err(e) => lease.report_broken(e.to_string()),
//! }
//!
//! pool.drain().await?;
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod lease;
pub mod pool;
pub mod stats;
mod ticket;
pub mod worker;

pub use config::PoolConfig;
pub use error::{FactoryError, PoolError};
pub use factory::WorkerFactory;
pub use lease::Lease;
pub use pool::Pool;
pub use stats::{PoolStats, PoolStatus};
pub use worker::{WorkerId, WorkerState};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::PoolConfig;
    pub use crate::error::{FactoryError, PoolError};
    pub use crate::factory::WorkerFactory;
    pub use crate::lease::Lease;
    pub use crate::pool::Pool;
    pub use crate::stats::{PoolStats, PoolStatus};
    pub use crate::worker::{WorkerId, WorkerState};
}
