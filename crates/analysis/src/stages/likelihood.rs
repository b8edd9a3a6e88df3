//! Likelihood - per-duration box-depth profiles
//!
//! Each normalized curve is binned in time with the trial duration as bin
//! width; a bin's depth is `1 - mean flux` and its weight the summed ivar.

use contracts::{ContractError, Query};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lightcurve::{BinMethod, LightCurve};
use crate::stage::{stage_error, DepthProfile, Link, StageKind, StageOutput};

/// Config of the likelihood stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LikelihoodConfig {
    pub method: BinMethod,
}

/// Likelihood stage kind
#[derive(Debug)]
pub struct Likelihood;

pub type LikelihoodStage = Link<Likelihood>;

impl StageKind for Likelihood {
    const TAG: &'static str = "likelihood";
    type Config = LikelihoodConfig;

    fn run(
        config: &LikelihoodConfig,
        input: StageOutput,
        query: &Query,
    ) -> Result<StageOutput, ContractError> {
        if query.durations.is_empty() {
            return Err(stage_error(Self::TAG, "query has no trial durations"));
        }

        let mut profiles = Vec::with_capacity(query.durations.len() * input.light_curves.len());
        for &duration in &query.durations {
            for lc in &input.light_curves {
                let binned = lc.bin(duration, config.method)?;
                profiles.push(DepthProfile {
                    duration,
                    curve: to_depth(binned),
                });
            }
        }

        debug!(profiles = profiles.len(), "depth profiles computed");
        Ok(StageOutput {
            light_curves: input.light_curves,
            profiles,
            peaks: Vec::new(),
        })
    }
}

fn to_depth(mut binned: LightCurve) -> LightCurve {
    for f in &mut binned.flux {
        *f = 1.0 - *f;
    }
    binned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_profile_per_duration_and_curve() {
        let lc = LightCurve::new(
            vec![0.0, 0.1, 0.5, 0.9],
            vec![1.0, 0.98, 1.0, 1.0],
            vec![1.0; 4],
        )
        .unwrap();
        let input = StageOutput {
            light_curves: vec![lc.clone(), lc],
            ..Default::default()
        };
        let query = Query::new(1, "/tmp/d.bin", [0.4, 0.2], 50.0, 400.0, "/tmp/r").unwrap();

        let out = Likelihood::run(&LikelihoodConfig::default(), input, &query).unwrap();
        assert_eq!(out.profiles.len(), 4);
        assert_eq!(out.profiles[0].duration, 0.2);
        assert_eq!(out.profiles[2].duration, 0.4);

        // first 0.2-day bin holds 1.0 and 0.98
        let first = &out.profiles[0].curve;
        assert!((first.flux[0] - 0.01).abs() < 1e-12);
        assert_eq!(first.ivar[0], 2.0);
    }
}
