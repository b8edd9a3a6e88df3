//! Batch - load-balanced execution of a set of work units
//!
//! Every unit path goes into one shared queue; `workers` tasks pull from it,
//! so a unit is handed to whichever worker frees up first. Each unit is
//! attempted exactly once. `run` returns after every unit reached a terminal
//! state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use contracts::{PoolProfile, UnitStatus};
use tracing::{debug, error, info, instrument, warn};

use crate::context::BatchContext;
use crate::discover::discover;
use crate::error::DispatcherError;
use crate::metrics::{BatchMetrics, MetricsSnapshot};
use crate::pool::connect;
use crate::worker_pool::WorkerPool;

/// Outcome of one unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    pub path: PathBuf,
    pub status: UnitStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

impl UnitReport {
    fn pending(path: PathBuf) -> Self {
        Self {
            path,
            status: UnitStatus::Pending,
            started_at: None,
            duration: None,
        }
    }
}

/// Outcome of a whole batch, in submission order
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub pool: String,
    pub units: Vec<UnitReport>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn succeeded(&self) -> Vec<&UnitReport> {
        self.with(|s| matches!(s, UnitStatus::Succeeded))
    }

    pub fn failed(&self) -> Vec<&UnitReport> {
        self.with(UnitStatus::is_failed)
    }

    pub fn cancelled(&self) -> Vec<&UnitReport> {
        self.with(|s| matches!(s, UnitStatus::Cancelled))
    }

    /// Every unit succeeded
    pub fn is_success(&self) -> bool {
        self.units
            .iter()
            .all(|u| matches!(u.status, UnitStatus::Succeeded))
    }

    fn with(&self, pred: impl Fn(&UnitStatus) -> bool) -> Vec<&UnitReport> {
        self.units.iter().filter(|u| pred(&u.status)).collect()
    }
}

/// A set of units bound to a pool
pub struct Batch<P> {
    pool: Arc<P>,
    units: Arc<Mutex<Vec<UnitReport>>>,
    metrics: Arc<BatchMetrics>,
    fail_fast: bool,
}

impl<P> Batch<P>
where
    P: WorkerPool + Sync + 'static,
{
    pub fn new(pool: P, paths: Vec<PathBuf>) -> Self {
        Self {
            pool: Arc::new(pool),
            units: Arc::new(Mutex::new(paths.into_iter().map(UnitReport::pending).collect())),
            metrics: Arc::new(BatchMetrics::new()),
            fail_fast: false,
        }
    }

    /// Cancel the remaining units after the first failure
    pub fn fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    pub fn len(&self) -> usize {
        lock(&self.units).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current status of every unit, in submission order
    pub fn statuses(&self) -> Vec<UnitStatus> {
        lock(&self.units).iter().map(|u| u.status.clone()).collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Execute every unit and wait for all of them.
    #[instrument(name = "batch_run", skip(self, ctx), fields(pool = %self.pool.name(), units = self.len()))]
    pub async fn run(&self, ctx: &BatchContext) -> BatchReport {
        let started = Instant::now();
        let total = self.len();
        let (tx, rx) = async_channel::bounded(total.max(1));
        for index in 0..total {
            if tx.try_send(index).is_err() {
                break;
            }
            self.metrics.inc_submitted();
            observability::record_unit_submitted(self.pool.name());
        }
        tx.close();

        let workers = self.pool.workers().clamp(1, total.max(1));
        info!(units = total, workers, "Dispatching batch");

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let worker = Worker {
                id: worker_id,
                pool: Arc::clone(&self.pool),
                units: Arc::clone(&self.units),
                metrics: Arc::clone(&self.metrics),
                ctx: ctx.clone(),
                fail_fast: self.fail_fast,
            };
            let rx = rx.clone();
            handles.push(tokio::spawn(async move { worker.run(rx).await }));
        }
        drop(rx);

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task aborted");
            }
        }

        let mut units = lock(&self.units);
        for unit in units.iter_mut().filter(|u| !u.status.is_terminal()) {
            unit.status = UnitStatus::Failed {
                message: "worker task aborted".to_string(),
            };
        }

        let report = BatchReport {
            pool: self.pool.name().to_string(),
            units: units.clone(),
            elapsed: started.elapsed(),
        };
        info!(
            succeeded = report.succeeded().len(),
            failed = report.failed().len(),
            cancelled = report.cancelled().len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Batch complete"
        );
        report
    }
}

struct Worker<P> {
    id: usize,
    pool: Arc<P>,
    units: Arc<Mutex<Vec<UnitReport>>>,
    metrics: Arc<BatchMetrics>,
    ctx: BatchContext,
    fail_fast: bool,
}

impl<P: WorkerPool + Sync> Worker<P> {
    async fn run(self, rx: async_channel::Receiver<usize>) {
        debug!(worker = self.id, "worker started");
        while let Ok(index) = rx.recv().await {
            if self.ctx.is_cancelled() {
                self.finish(index, UnitStatus::Cancelled, None);
                continue;
            }

            let path = self.start(index);
            let begin = Instant::now();
            let status = match self.pool.execute(&path).await {
                Ok(()) => UnitStatus::Succeeded,
                Err(e) => {
                    warn!(worker = self.id, unit = %path.display(), error = %e, "unit failed");
                    if self.fail_fast {
                        self.ctx.cancel();
                    }
                    UnitStatus::Failed {
                        message: e.to_string(),
                    }
                }
            };
            self.finish(index, status, Some(begin.elapsed()));
        }
        debug!(worker = self.id, "worker stopped");
    }

    fn start(&self, index: usize) -> PathBuf {
        self.metrics.inc_running();
        observability::record_unit_started(self.pool.name());

        let mut units = lock(&self.units);
        let unit = &mut units[index];
        unit.status = UnitStatus::Running;
        unit.started_at = Some(Utc::now());
        debug!(worker = self.id, unit = %unit.path.display(), "unit claimed");
        unit.path.clone()
    }

    fn finish(&self, index: usize, status: UnitStatus, duration: Option<Duration>) {
        match &status {
            UnitStatus::Succeeded => self.metrics.inc_succeeded(),
            UnitStatus::Failed { .. } => self.metrics.inc_failed(),
            UnitStatus::Cancelled => self.metrics.inc_cancelled(),
            UnitStatus::Pending | UnitStatus::Running => {}
        }
        if let Some(duration) = duration {
            self.metrics.dec_running();
            observability::record_unit_finished(self.pool.name(), &status, duration.as_secs_f64());
        }

        let mut units = lock(&self.units);
        units[index].status = status;
        units[index].duration = duration;

        let progress = self.metrics.snapshot();
        debug!(
            finished = progress.finished(),
            submitted = progress.submitted,
            "batch progress"
        );
    }
}

fn lock(units: &Mutex<Vec<UnitReport>>) -> MutexGuard<'_, Vec<UnitReport>> {
    units.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Discover the units matching `file_pattern`, connect to the pool named by
/// `pool_profile` and run them all.
///
/// # Errors
/// Pattern or connection failures abort before any unit runs; unit failures
/// are reported in the returned [`BatchReport`].
pub async fn run(
    file_pattern: &str,
    pool_profile: Option<&Path>,
) -> Result<BatchReport, DispatcherError> {
    run_with_context(file_pattern, pool_profile, &BatchContext::new()).await
}

/// [`run`] with a caller-owned cancellation context
pub async fn run_with_context(
    file_pattern: &str,
    pool_profile: Option<&Path>,
    ctx: &BatchContext,
) -> Result<BatchReport, DispatcherError> {
    let paths = discover(file_pattern)?;
    let (pool, profile): (_, PoolProfile) = connect(pool_profile)?;
    if paths.is_empty() {
        warn!(pattern = file_pattern, "no work units matched");
    }
    let batch = Batch::new(pool, paths).fail_fast(profile.fail_fast);
    Ok(batch.run(ctx).await)
}
