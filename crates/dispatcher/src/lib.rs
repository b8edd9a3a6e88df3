//! # Dispatcher
//!
//! Batch dispatch of persisted work units.
//!
//! Responsibilities:
//! - Discover unit artifacts by glob pattern
//! - Connect to the worker pool named by a profile
//! - Hand units to the first free worker, track per-unit status
//! - Isolate failures: one failing unit never stops the others (unless the
//!   profile asks for fail-fast)

pub mod batch;
pub mod context;
pub mod discover;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod worker_pool;

pub use batch::{run, run_with_context, Batch, BatchReport, UnitReport};
pub use context::BatchContext;
pub use contracts::{PoolProfile, UnitStatus};
pub use discover::discover;
pub use error::DispatcherError;
pub use metrics::{BatchMetrics, MetricsSnapshot};
pub use pool::{connect, connect_profile, ConnectedPool, InProcessPool, SubprocessPool};
pub use worker_pool::{LocalWorkerPool, WorkerPool};
