//! InjectedSystem - synthetic planets added to a query
//!
//! Limb darkening (`q1`, `q2`) belongs to the star, so it is stored once per
//! system rather than per planet.

use serde::{Deserialize, Serialize};

/// Parameters of one synthetic transiting planet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    /// Orbital period (days)
    pub period: f64,

    /// Reference transit time (days), in `[0, period)`
    pub t0: f64,

    /// Planet-to-star radius ratio
    pub radius: f64,

    /// Impact parameter
    pub b: f64,

    /// Eccentricity, in `[0, 1)`
    pub e: f64,

    /// Argument of periastron (radians)
    pub pomega: f64,
}

/// A synthetic multi-planet system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectedSystem {
    /// First limb-darkening coefficient (Kipping parameterization)
    pub q1: f64,

    /// Second limb-darkening coefficient
    pub q2: f64,

    /// Stellar mass (solar masses)
    pub mstar: f64,

    /// Stellar radius (solar radii)
    pub rstar: f64,

    /// Planets, in draw order
    #[serde(rename = "injections")]
    pub planets: Vec<Planet>,
}

impl InjectedSystem {
    /// Number of planets in the system
    pub fn len(&self) -> usize {
        self.planets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planets.is_empty()
    }
}
