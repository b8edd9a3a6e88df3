//! Inject - adds synthetic transits to the raw light curves
//!
//! Transits are modeled as boxes of depth `radius²` lasting the full
//! (first-to-fourth contact) duration. Limb darkening is carried in the query
//! but does not shape the box.

use std::f64::consts::PI;

use contracts::{ContractError, InjectedSystem, Planet, Query};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stage::{Link, StageKind, StageOutput};

/// Astronomical unit in solar radii
const AU_IN_RSUN: f64 = 215.032;

const DAYS_PER_YEAR: f64 = 365.25;

/// Config of the injection stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InjectConfig {}

/// Injection stage kind
#[derive(Debug)]
pub struct Inject;

/// Injection stage wrapping its upstream
pub type InjectStage = Link<Inject>;

impl StageKind for Inject {
    const TAG: &'static str = "inject";
    type Config = InjectConfig;

    fn run(
        _config: &InjectConfig,
        mut input: StageOutput,
        query: &Query,
    ) -> Result<StageOutput, ContractError> {
        let Some(system) = &query.injection else {
            return Ok(input);
        };

        let mut touched = 0usize;
        for planet in &system.planets {
            let Some(duration) = transit_duration(system, planet) else {
                debug!(period = planet.period, b = planet.b, "planet does not transit");
                continue;
            };
            let depth_factor = 1.0 - planet.radius * planet.radius;
            for lc in &mut input.light_curves {
                for (t, f) in lc.time.iter().zip(lc.flux.iter_mut()) {
                    if in_transit(*t, planet, duration) {
                        *f *= depth_factor;
                        touched += 1;
                    }
                }
            }
        }

        debug!(planets = system.len(), samples = touched, "injected transits");
        Ok(input)
    }
}

/// Total transit duration (days), `None` when the planet misses the disk.
pub fn transit_duration(system: &InjectedSystem, planet: &Planet) -> Option<f64> {
    let a_au = (system.mstar * (planet.period / DAYS_PER_YEAR).powi(2)).cbrt();
    let a_over_r = a_au * AU_IN_RSUN / system.rstar;

    let chord = (1.0 + planet.radius).powi(2) - planet.b * planet.b;
    if chord <= 0.0 || a_over_r <= 0.0 {
        return None;
    }
    let circular = planet.period / PI * (chord.sqrt() / a_over_r).min(1.0).asin();

    let ecc = (1.0 - planet.e * planet.e).sqrt() / (1.0 + planet.e * planet.pomega.sin());
    Some(circular * ecc)
}

fn in_transit(t: f64, planet: &Planet, duration: f64) -> bool {
    let phase = (t - planet.t0).rem_euclid(planet.period);
    phase.min(planet.period - phase) < 0.5 * duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lightcurve::LightCurve;

    fn earth_like() -> (InjectedSystem, Planet) {
        let planet = Planet {
            period: 365.25,
            t0: 10.0,
            radius: 0.1,
            b: 0.0,
            e: 0.0,
            pomega: 0.0,
        };
        let system = InjectedSystem {
            q1: 0.5,
            q2: 0.5,
            mstar: 1.0,
            rstar: 1.0,
            planets: vec![planet],
        };
        (system, planet)
    }

    #[test]
    fn test_earth_duration() {
        let (system, planet) = earth_like();
        let duration = transit_duration(&system, &planet).unwrap();
        // ~13h for a central transit of an Earth-orbit planet with k = 0.1
        assert!(duration > 0.5 && duration < 0.65, "duration = {duration}");
    }

    #[test]
    fn test_grazing_miss() {
        let (system, mut planet) = earth_like();
        planet.b = 1.2;
        assert!(transit_duration(&system, &planet).is_none());
    }

    #[test]
    fn test_box_applied_at_epoch() {
        let (system, _) = earth_like();
        let lc = LightCurve::new(
            vec![0.0, 10.0, 375.25, 200.0],
            vec![1.0; 4],
            vec![1.0; 4],
        )
        .unwrap();
        let query = Query::new(1, "/tmp/d.bin", [0.2], 50.0, 400.0, "/tmp/r")
            .unwrap()
            .with_injection(system);
        let input = StageOutput {
            light_curves: vec![lc],
            ..Default::default()
        };

        let out = Inject::run(&InjectConfig::default(), input, &query).unwrap();
        let flux = &out.light_curves[0].flux;
        assert_eq!(flux[0], 1.0);
        assert!((flux[1] - 0.99).abs() < 1e-12);
        assert!((flux[2] - 0.99).abs() < 1e-12);
        assert_eq!(flux[3], 1.0);
    }

    #[test]
    fn test_no_injection_is_passthrough() {
        let lc = LightCurve::new(vec![0.0], vec![1.0], vec![1.0]).unwrap();
        let query = Query::new(1, "/tmp/d.bin", [0.2], 50.0, 400.0, "/tmp/r").unwrap();
        let input = StageOutput {
            light_curves: vec![lc],
            ..Default::default()
        };
        let out = Inject::run(&InjectConfig::default(), input.clone(), &query).unwrap();
        assert_eq!(out, input);
    }
}
