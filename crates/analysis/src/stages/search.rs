//! One- and two-dimensional transit searches
//!
//! The 1-D search merges the per-curve depth profiles into a single time
//! series per duration. The 2-D search folds those series over a log-spaced
//! period grid and keeps the most significant (period, epoch) boxes.

use std::fs;

use contracts::{ContractError, Query};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::lightcurve::{BinMethod, LightCurve};
use crate::stage::{stage_error, DepthProfile, Link, Peak, StageKind, StageOutput};

/// File written under `Query::validation_path`
pub const PEAKS_FILE: &str = "peaks.json";

/// Config of the 1-D search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneDSearchConfig {}

/// 1-D search stage kind
#[derive(Debug)]
pub struct OneDSearch;

pub type OneDSearchStage = Link<OneDSearch>;

impl StageKind for OneDSearch {
    const TAG: &'static str = "one_d_search";
    const CACHE_BY_DEFAULT: bool = true;
    type Config = OneDSearchConfig;

    fn run(
        _config: &OneDSearchConfig,
        input: StageOutput,
        query: &Query,
    ) -> Result<StageOutput, ContractError> {
        let mut profiles = Vec::with_capacity(query.durations.len());
        for &duration in &query.durations {
            let mut samples: Vec<(f64, f64, f64)> = input
                .profiles
                .iter()
                .filter(|p| p.duration == duration)
                .flat_map(|p| p.curve.samples())
                .collect();
            samples.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut curve = LightCurve::default();
            for (t, d, w) in samples {
                curve.time.push(t);
                curve.flux.push(d);
                curve.ivar.push(w);
            }
            profiles.push(DepthProfile { duration, curve });
        }

        debug!(durations = profiles.len(), "profiles merged");
        Ok(StageOutput {
            light_curves: Vec::new(),
            profiles,
            peaks: Vec::new(),
        })
    }
}

/// Config of the 2-D search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwoDSearchConfig {
    /// Number of peaks kept and reported
    pub top_peaks: usize,
    /// Upper bound on the period grid size
    pub max_periods: usize,
}

impl Default for TwoDSearchConfig {
    fn default() -> Self {
        Self {
            top_peaks: 10,
            max_periods: 100_000,
        }
    }
}

/// 2-D search stage kind
#[derive(Debug)]
pub struct TwoDSearch;

pub type TwoDSearchStage = Link<TwoDSearch>;

impl StageKind for TwoDSearch {
    const TAG: &'static str = "two_d_search";
    type Config = TwoDSearchConfig;

    fn run(
        config: &TwoDSearchConfig,
        input: StageOutput,
        query: &Query,
    ) -> Result<StageOutput, ContractError> {
        let baseline = baseline(&input.profiles)
            .ok_or_else(|| stage_error(Self::TAG, "no depth samples to search"))?;
        let min_duration = query
            .min_duration()
            .ok_or_else(|| stage_error(Self::TAG, "query has no trial durations"))?;
        let periods = period_grid(
            query.min_period,
            query.max_period,
            min_duration,
            baseline,
            config.max_periods,
        );

        let mut peaks = Vec::new();
        for profile in &input.profiles {
            // fold works on flux, so turn depths back into flux
            let flux_curve = LightCurve {
                time: profile.curve.time.clone(),
                flux: profile.curve.flux.iter().map(|d| 1.0 - d).collect(),
                ivar: profile.curve.ivar.clone(),
            };
            for &period in &periods {
                let folded =
                    flux_curve.fold_and_bin(period, profile.duration, BinMethod::WeightedMean)?;
                if let Some(fit) = folded.best_epoch(1) {
                    peaks.push(Peak {
                        period,
                        t0: folded.time[fit.bin],
                        duration: profile.duration,
                        depth: fit.depth,
                        snr: fit.snr,
                    });
                }
            }
        }

        peaks.sort_by(|a, b| b.snr.total_cmp(&a.snr));
        peaks.truncate(config.top_peaks);

        write_peaks(query, &peaks)?;
        info!(
            kicid = query.kicid,
            periods = periods.len(),
            best_period = peaks.first().map(|p| p.period),
            best_snr = peaks.first().map(|p| p.snr),
            "2-D search complete"
        );

        Ok(StageOutput {
            light_curves: Vec::new(),
            profiles: Vec::new(),
            peaks,
        })
    }
}

/// Time span covered by all profiles
fn baseline(profiles: &[DepthProfile]) -> Option<f64> {
    let (lo, hi) = profiles
        .iter()
        .filter_map(|p| p.curve.extent())
        .reduce(|(a, b), (c, d)| (a.min(c), b.max(d)))?;
    Some(hi - lo)
}

/// Log-spaced periods; consecutive periods drift by at most `min_duration`
/// over the baseline.
pub fn period_grid(
    min_period: f64,
    max_period: f64,
    min_duration: f64,
    baseline: f64,
    max_periods: usize,
) -> Vec<f64> {
    let mut step = if baseline > 0.0 {
        min_duration / baseline
    } else {
        1.0
    };
    let span = (max_period / min_period).ln();
    let needed = span / step.ln_1p();
    if needed > max_periods as f64 {
        step = (span / max_periods as f64).exp_m1();
    }

    let mut periods = Vec::new();
    let mut period = min_period;
    while period <= max_period && periods.len() < max_periods {
        periods.push(period);
        period *= 1.0 + step;
    }
    periods
}

fn write_peaks(query: &Query, peaks: &[Peak]) -> Result<(), ContractError> {
    let dir = &query.validation_path;
    fs::create_dir_all(dir).map_err(|e| ContractError::path(dir, e.to_string()))?;
    let json = serde_json::to_string_pretty(peaks)
        .map_err(|e| stage_error(TwoDSearch::TAG, e.to_string()))?;
    fs::write(dir.join(PEAKS_FILE), json)?;
    Ok(())
}
