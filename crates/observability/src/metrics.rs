//! Work-unit execution metrics
//!
//! Global `metrics` counters for the Prometheus exporter, plus an in-memory
//! aggregator for end-of-batch summaries.

use std::collections::HashMap;

use contracts::UnitStatus;
use metrics::{counter, gauge, histogram};

/// Record a unit handed to a pool
pub fn record_unit_submitted(pool: &str) {
    counter!("turnstile_units_submitted_total", "pool" => pool.to_string()).increment(1);
}

/// Record a unit claimed by a worker
pub fn record_unit_started(pool: &str) {
    gauge!("turnstile_units_running", "pool" => pool.to_string()).increment(1.0);
}

/// Record a unit that finished running
pub fn record_unit_finished(pool: &str, status: &UnitStatus, seconds: f64) {
    gauge!("turnstile_units_running", "pool" => pool.to_string()).decrement(1.0);
    histogram!("turnstile_unit_duration_seconds", "pool" => pool.to_string()).record(seconds);

    match status {
        UnitStatus::Succeeded => {
            counter!("turnstile_units_succeeded_total", "pool" => pool.to_string()).increment(1)
        }
        UnitStatus::Failed { .. } => {
            counter!("turnstile_units_failed_total", "pool" => pool.to_string()).increment(1)
        }
        UnitStatus::Pending | UnitStatus::Running | UnitStatus::Cancelled => {}
    }
}

/// 批次指标聚合器
///
/// Aggregates unit outcomes in memory for a printable summary.
#[derive(Debug, Clone, Default)]
pub struct BatchStatsAggregator {
    pub total_units: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,

    /// Execution time of units that ran (seconds)
    pub duration_stats: RunningStats,

    /// Failure count per error message
    pub failure_reasons: HashMap<String, u64>,
}

impl BatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit outcome; `seconds` is `None` for units that never ran
    pub fn update(&mut self, status: &UnitStatus, seconds: Option<f64>) {
        self.total_units += 1;
        match status {
            UnitStatus::Succeeded => self.succeeded += 1,
            UnitStatus::Failed { message } => {
                self.failed += 1;
                *self.failure_reasons.entry(message.clone()).or_insert(0) += 1;
            }
            UnitStatus::Cancelled => self.cancelled += 1,
            UnitStatus::Pending | UnitStatus::Running => {}
        }
        if let Some(seconds) = seconds {
            self.duration_stats.push(seconds);
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total_units: self.total_units,
            succeeded: self.succeeded,
            failed: self.failed,
            cancelled: self.cancelled,
            failure_rate: if self.total_units > 0 {
                self.failed as f64 / self.total_units as f64 * 100.0
            } else {
                0.0
            },
            duration_secs: StatsSummary::from(&self.duration_stats),
            failure_reasons: self.failure_reasons.clone(),
        }
    }
}

/// 批次摘要
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total_units: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub failure_rate: f64,
    pub duration_secs: StatsSummary,
    pub failure_reasons: HashMap<String, u64>,
}

impl std::fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Batch Summary ===")?;
        writeln!(f, "Total units: {}", self.total_units)?;
        writeln!(f, "Succeeded: {}", self.succeeded)?;
        writeln!(
            f,
            "Failed: {} ({:.2}%)",
            self.failed, self.failure_rate
        )?;
        writeln!(f, "Cancelled: {}", self.cancelled)?;
        writeln!(f, "Unit duration (s): {}", self.duration_secs)?;

        if !self.failure_reasons.is_empty() {
            writeln!(f, "Failures:")?;
            let mut reasons: Vec<_> = self.failure_reasons.iter().collect();
            reasons.sort();
            for (reason, count) in reasons {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
