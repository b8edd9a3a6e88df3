//! Prepare - cleans and normalizes the raw light curves

use contracts::{ContractError, Query};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::lightcurve::{median, LightCurve};
use crate::stage::{stage_error, Link, StageKind, StageOutput};

/// Config of the preparation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareStageConfig {
    /// Curves with fewer usable samples are dropped
    pub min_samples: usize,
}

impl Default for PrepareStageConfig {
    fn default() -> Self {
        Self { min_samples: 1 }
    }
}

/// Preparation stage kind
#[derive(Debug)]
pub struct Prepare;

pub type PrepareStage = Link<Prepare>;

impl StageKind for Prepare {
    const TAG: &'static str = "prepare";
    type Config = PrepareStageConfig;

    fn run(
        config: &PrepareStageConfig,
        input: StageOutput,
        query: &Query,
    ) -> Result<StageOutput, ContractError> {
        let total = input.light_curves.len();
        let light_curves: Vec<LightCurve> = input
            .light_curves
            .into_iter()
            .filter_map(|lc| normalize(&lc, config.min_samples))
            .collect();

        if light_curves.is_empty() {
            return Err(stage_error(
                Self::TAG,
                format!("no usable light curves for target {}", query.kicid),
            ));
        }
        if light_curves.len() < total {
            warn!(
                kept = light_curves.len(),
                total, "dropped light curves without usable samples"
            );
        }
        debug!(curves = light_curves.len(), "light curves normalized");

        Ok(StageOutput {
            light_curves,
            ..Default::default()
        })
    }
}

/// Drop bad samples and divide by the median flux
fn normalize(lc: &LightCurve, min_samples: usize) -> Option<LightCurve> {
    let mut clean = LightCurve::default();
    for (t, f, w) in lc.samples() {
        if t.is_finite() && f.is_finite() && w.is_finite() && w > 0.0 {
            clean.time.push(t);
            clean.flux.push(f);
            clean.ivar.push(w);
        }
    }
    if clean.len() < min_samples.max(1) {
        return None;
    }

    let scale = median(&clean.flux)?;
    if scale <= 0.0 {
        return None;
    }
    for f in &mut clean.flux {
        *f /= scale;
    }
    for w in &mut clean.ivar {
        *w *= scale * scale;
    }
    Some(clean)
}
