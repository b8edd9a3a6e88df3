//! # Prior
//!
//! Draws synthetic multi-planet systems for injection tests.
//!
//! The random source is always passed in: nothing here seeds or touches
//! process-wide state, so a seeded `StdRng` reproduces a system exactly.
//!
//! ```
//! use prior::{generate_system, seeded_rng};
//!
//! let mut rng = seeded_rng(Some(42));
//! let system = generate_system(&mut rng, 3, 1.0, 1.0, 50.0, 400.0).unwrap();
//! assert_eq!(system.planets.len(), 3);
//! ```

use std::f64::consts::TAU;

use contracts::{ContractError, InjectedSystem, Planet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use tracing::debug;

/// Prior distributions for the per-planet parameters
///
/// Periods are always log-uniform over the requested range and epochs
/// uniform over one period; everything else is configurable here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemPrior {
    /// Uniform bounds for the radius ratio
    pub radius: (f64, f64),
    /// Uniform bounds for the impact parameter
    pub impact: (f64, f64),
    /// Beta shape parameters for the eccentricity
    pub eccentricity: (f64, f64),
}

impl Default for SystemPrior {
    fn default() -> Self {
        Self {
            radius: (0.005, 0.16),
            impact: (0.0, 1.0),
            // Kipping (2013) fit to radial-velocity planets
            eccentricity: (0.867, 3.03),
        }
    }
}

impl SystemPrior {
    /// Draw a system of `count` planets around a star of the given mass and radius.
    ///
    /// Draw order is fixed (all periods, then epochs, radii, impact
    /// parameters, eccentricities, arguments of periastron, then `q1`, `q2`)
    /// so a given seed always maps to the same system.
    ///
    /// # Errors
    /// `Configuration` when the period range is empty or not positive, or
    /// when a prior's bounds are inverted.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        mstar: f64,
        rstar: f64,
        min_period: f64,
        max_period: f64,
    ) -> Result<InjectedSystem, ContractError> {
        self.check(min_period, max_period)?;

        let (ln_min, ln_max) = (min_period.ln(), max_period.ln());
        let periods: Vec<f64> = (0..count)
            .map(|_| {
                rng.random_range(ln_min..ln_max)
                    .exp()
                    .clamp(min_period, max_period)
            })
            .collect();
        let t0s: Vec<f64> = periods.iter().map(|&p| rng.random_range(0.0..p)).collect();
        let radii = self.uniform(rng, self.radius, count);
        let impacts = self.uniform(rng, self.impact, count);

        let (alpha, beta) = self.eccentricity;
        let ecc_dist = Beta::new(alpha, beta).map_err(|e| {
            ContractError::configuration("prior.eccentricity", e.to_string())
        })?;
        let eccentricities: Vec<f64> = (0..count)
            .map(|_| ecc_dist.sample(rng).min(1.0 - f64::EPSILON))
            .collect();
        let pomegas: Vec<f64> = (0..count).map(|_| rng.random_range(0.0..TAU)).collect();

        let q1 = rng.random_range(0.0..=1.0);
        let q2 = rng.random_range(0.0..=1.0);

        let planets = (0..count)
            .map(|i| Planet {
                period: periods[i],
                t0: t0s[i],
                radius: radii[i],
                b: impacts[i],
                e: eccentricities[i],
                pomega: pomegas[i],
            })
            .collect();

        debug!(count, q1, q2, "drew injected system");

        Ok(InjectedSystem {
            q1,
            q2,
            mstar,
            rstar,
            planets,
        })
    }

    fn uniform<R: Rng + ?Sized>(&self, rng: &mut R, (lo, hi): (f64, f64), n: usize) -> Vec<f64> {
        (0..n).map(|_| rng.random_range(lo..=hi)).collect()
    }

    fn check(&self, min_period: f64, max_period: f64) -> Result<(), ContractError> {
        if !(min_period.is_finite() && min_period > 0.0) {
            return Err(ContractError::configuration(
                "min_period",
                format!("min_period must be finite and > 0, got {min_period}"),
            ));
        }
        if !(max_period.is_finite() && min_period < max_period) {
            return Err(ContractError::configuration(
                "min_period / max_period",
                format!("min_period ({min_period}) must be < max_period ({max_period})"),
            ));
        }
        for (field, (lo, hi)) in [("prior.radius", self.radius), ("prior.impact", self.impact)] {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(ContractError::configuration(
                    field,
                    format!("invalid bounds [{lo}, {hi}]"),
                ));
            }
        }
        Ok(())
    }
}

/// Draw a system from the default prior.
pub fn generate_system<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    mstar: f64,
    rstar: f64,
    min_period: f64,
    max_period: f64,
) -> Result<InjectedSystem, ContractError> {
    SystemPrior::default().sample(rng, count, mstar, rstar, min_period, max_period)
}

/// Random source for injection draws: seeded when a seed is given, fresh entropy otherwise.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
