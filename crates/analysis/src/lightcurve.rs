//! Light-curve containers and the folding kernels used by the search stages

use serde::{Deserialize, Serialize};
use tracing::warn;

use contracts::ContractError;

/// Upper bound on the bins a single fold or time binning may allocate
pub const MAX_BINS: usize = 1 << 22;

/// How samples falling into one bin are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinMethod {
    /// Inverse-variance weighted mean
    #[default]
    WeightedMean,
    /// Median of the raw fluxes
    Median,
}

/// Time series of flux measurements with inverse variances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightCurve {
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
    pub ivar: Vec<f64>,
}

impl LightCurve {
    /// Build a light curve, checking that all columns have the same length
    pub fn new(time: Vec<f64>, flux: Vec<f64>, ivar: Vec<f64>) -> Result<Self, ContractError> {
        if time.len() != flux.len() || time.len() != ivar.len() {
            return Err(ContractError::Other(format!(
                "light curve columns differ in length: time={}, flux={}, ivar={}",
                time.len(),
                flux.len(),
                ivar.len()
            )));
        }
        Ok(Self { time, flux, ivar })
    }

    /// Curve with `n` zero-flux, zero-weight samples
    pub fn zeroed(n: usize) -> Self {
        Self {
            time: vec![0.0; n],
            flux: vec![0.0; n],
            ivar: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// `(min_time, max_time)`, or `None` for an empty curve
    pub fn extent(&self) -> Option<(f64, f64)> {
        let first = *self.time.first()?;
        Some(
            self.time
                .iter()
                .fold((first, first), |(mn, mx), &t| (mn.min(t), mx.max(t))),
        )
    }

    /// Iterate `(time, flux, ivar)` triples
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.time
            .iter()
            .zip(&self.flux)
            .zip(&self.ivar)
            .map(|((&t, &f), &w)| (t, f, w))
    }

    /// Fold on `period` and bin the phases with width `dt`.
    ///
    /// Bin `i` is centred at `i * dt + dt / 2`. Empty bins end up with NaN flux
    /// and zero weight.
    ///
    /// # Errors
    /// `StageExecution` when `period` or `dt` is not finite and positive, or
    /// when the fold would need more than [`MAX_BINS`] bins.
    pub fn fold_and_bin(
        &self,
        period: f64,
        dt: f64,
        method: BinMethod,
    ) -> Result<LightCurve, ContractError> {
        let nbins = bin_count(period, dt)?;
        let mut folded = LightCurve::zeroed(nbins);
        for (i, t) in folded.time.iter_mut().enumerate() {
            *t = i as f64 * dt + 0.5 * dt;
        }

        let bin_of = |t: f64| {
            let bin = (t.rem_euclid(period) / dt) as usize;
            if bin >= nbins {
                warn!(time = t, period, "phase bin out of range, clamping");
                nbins - 1
            } else {
                bin
            }
        };

        match method {
            BinMethod::WeightedMean => {
                for (t, f, w) in self.samples() {
                    let bin = bin_of(t);
                    folded.flux[bin] += f * w;
                    folded.ivar[bin] += w;
                }
                for (f, &w) in folded.flux.iter_mut().zip(&folded.ivar) {
                    *f /= w;
                }
            }
            BinMethod::Median => {
                let mut members: Vec<Vec<f64>> = vec![Vec::new(); nbins];
                for (t, f, w) in self.samples() {
                    let bin = bin_of(t);
                    members[bin].push(f);
                    folded.ivar[bin] += w;
                }
                for (f, values) in folded.flux.iter_mut().zip(&members) {
                    *f = median(values).unwrap_or(f64::NAN);
                }
            }
        }

        Ok(folded)
    }

    /// Bin in time (no folding) with width `dt`, keeping only populated bins.
    ///
    /// # Errors
    /// Same as [`LightCurve::fold_and_bin`], with the baseline as the period.
    pub fn bin(&self, dt: f64, method: BinMethod) -> Result<LightCurve, ContractError> {
        let Some((t_min, t_max)) = self.extent() else {
            return Ok(LightCurve::default());
        };
        let shifted = LightCurve {
            time: self.time.iter().map(|t| t - t_min).collect(),
            flux: self.flux.clone(),
            ivar: self.ivar.clone(),
        };
        // A period longer than the baseline means nothing wraps around.
        let binned = shifted.fold_and_bin(t_max - t_min + dt, dt, method)?;

        let mut out = LightCurve::default();
        for (t, f, w) in binned.samples() {
            if w > 0.0 && f.is_finite() {
                out.time.push(t + t_min);
                out.flux.push(f);
                out.ivar.push(w);
            }
        }
        Ok(out)
    }

    /// Most significant box of `nbins` consecutive (cyclic) bins.
    ///
    /// Depth is `1 - weighted mean flux` and significance `depth * sqrt(Σivar)`;
    /// windows without weight are skipped.
    pub fn best_epoch(&self, nbins: usize) -> Option<BoxFit> {
        let n = self.len();
        if n == 0 || nbins == 0 {
            return None;
        }
        let mut best: Option<BoxFit> = None;
        for i in 0..n {
            let (mut num, mut den) = (0.0, 0.0);
            for j in 0..nbins {
                let m = (i + j) % n;
                if self.ivar[m] > 0.0 {
                    num += self.flux[m] * self.ivar[m];
                    den += self.ivar[m];
                }
            }
            if den <= 0.0 {
                continue;
            }
            let depth = 1.0 - num / den;
            let snr = depth * den.sqrt();
            if best.is_none_or(|b| snr > b.snr) {
                best = Some(BoxFit { bin: i, depth, snr });
            }
        }
        best
    }
}

/// Result of a box search over a binned curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxFit {
    /// First bin of the window
    pub bin: usize,
    pub depth: f64,
    pub snr: f64,
}

fn bin_count(period: f64, dt: f64) -> Result<usize, ContractError> {
    if !(period.is_finite() && dt.is_finite()) || period <= 0.0 || dt <= 0.0 {
        return Err(ContractError::stage(
            "fold",
            format!("period ({period}) and bin width ({dt}) must be finite and > 0"),
        ));
    }
    let ratio = period / dt;
    if ratio >= MAX_BINS as f64 {
        return Err(ContractError::stage(
            "fold",
            format!("period {period} at bin width {dt} needs more than {MAX_BINS} bins"),
        ));
    }
    Ok(ratio as usize + 1)
}

/// Median (lower-middle element for even lengths); `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut scratch = values.to_vec();
    let mid = (scratch.len() - 1) / 2;
    let (_, m, _) = scratch.select_nth_unstable_by(mid, f64::total_cmp);
    Some(*m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(time: &[f64], flux: &[f64]) -> LightCurve {
        LightCurve::new(time.to_vec(), flux.to_vec(), vec![1.0; time.len()]).unwrap()
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        assert!(LightCurve::new(vec![0.0, 1.0], vec![1.0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn test_extent() {
        let lc = curve(&[3.0, -1.0, 7.5, 2.0], &[1.0; 4]);
        assert_eq!(lc.extent(), Some((-1.0, 7.5)));
        assert_eq!(LightCurve::default().extent(), None);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_fold_weighted_mean() {
        // Period 2, dt 1: phases 0.5 -> bin 0, 1.5 -> bin 1
        let lc = LightCurve::new(
            vec![0.5, 1.5, 2.5, 3.5],
            vec![1.0, 0.5, 3.0, 0.5],
            vec![1.0, 1.0, 1.0, 1.0],
        )
        .unwrap();
        let folded = lc.fold_and_bin(2.0, 1.0, BinMethod::WeightedMean).unwrap();
        assert_eq!(folded.len(), 3);
        assert_eq!(folded.time, vec![0.5, 1.5, 2.5]);
        assert_eq!(folded.flux[0], 2.0);
        assert_eq!(folded.flux[1], 0.5);
        assert_eq!(folded.ivar[0], 2.0);
        assert!(folded.flux[2].is_nan());
        assert_eq!(folded.ivar[2], 0.0);
    }

    #[test]
    fn test_fold_median() {
        let lc = curve(&[0.1, 2.1, 4.1], &[1.0, 9.0, 2.0]);
        let folded = lc.fold_and_bin(2.0, 1.0, BinMethod::Median).unwrap();
        assert_eq!(folded.flux[0], 2.0);
        assert_eq!(folded.ivar[0], 3.0);
    }

    #[test]
    fn test_fold_negative_times() {
        let lc = curve(&[-0.5], &[1.0]);
        let folded = lc.fold_and_bin(2.0, 1.0, BinMethod::WeightedMean).unwrap();
        assert_eq!(folded.ivar[1], 1.0);
    }

    #[test]
    fn test_bin_in_time() {
        let lc = curve(&[10.0, 10.2, 11.1, 13.0], &[1.0, 3.0, 5.0, 7.0]);
        let binned = lc.bin(1.0, BinMethod::WeightedMean).unwrap();
        assert_eq!(binned.len(), 3);
        assert_eq!(binned.flux, vec![2.0, 5.0, 7.0]);
        assert_eq!(binned.time[0], 10.5);
    }

    #[test]
    fn test_tiny_bin_width_is_rejected() {
        let lc = curve(&[0.0, 300.0], &[1.0, 1.0]);
        let err = lc.bin(1e-9, BinMethod::WeightedMean).unwrap_err();
        assert_eq!(err.kind(), contracts::ErrorKind::StageExecution);
        assert!(err.to_string().contains("bins"));

        let err = lc.fold_and_bin(400.0, 1e-9, BinMethod::Median).unwrap_err();
        assert_eq!(err.kind(), contracts::ErrorKind::StageExecution);
        assert!(lc.fold_and_bin(400.0, 0.0, BinMethod::Median).is_err());
    }

    #[test]
    fn test_epoch_finds_dip() {
        let flux = [1.0, 1.0, 0.9, 1.0, 1.0, 1.0];
        let lc = curve(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], &flux);
        let fit = lc.best_epoch(1).unwrap();
        assert_eq!(fit.bin, 2);
        assert!((fit.depth - 0.1).abs() < 1e-12);

        let wide = lc.best_epoch(2).unwrap();
        assert!((wide.depth - 0.05).abs() < 1e-12);
        assert!((wide.snr - 0.05 * 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_epoch_prefers_significance() {
        // one deep sample vs. a shallower dip backed by more weight
        let lc = LightCurve::new(
            vec![0.0, 1.0, 2.0],
            vec![0.9, 1.0, 0.95],
            vec![1.0, 1.0, 16.0],
        )
        .unwrap();
        assert_eq!(lc.best_epoch(1).unwrap().bin, 2);
    }

    #[test]
    fn test_epoch_empty_curve() {
        assert!(LightCurve::default().best_epoch(1).is_none());
        let lc = LightCurve::new(vec![0.0], vec![f64::NAN], vec![0.0]).unwrap();
        assert!(lc.best_epoch(1).is_none());
    }
}
