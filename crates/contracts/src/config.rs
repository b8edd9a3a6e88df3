//! Configuration types - Config Loader output
//!
//! `PrepareConfig` describes how one target is prepared; `PoolProfile`
//! describes the worker pool a batch is dispatched to.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Config file version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Search and injection settings for preparing a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepareConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Trial transit durations (days)
    #[serde(default = "default_durations")]
    pub durations: Vec<f64>,

    /// Minimum orbital period (days)
    #[serde(default = "default_min_period")]
    pub min_period: f64,

    /// Maximum orbital period (days)
    #[serde(default = "default_max_period")]
    pub max_period: f64,

    /// Synthetic signal injection (disabled when absent)
    #[serde(default)]
    pub injection: Option<InjectionConfig>,

    /// Per-stage cache flags
    #[serde(default)]
    pub cache: CachePolicy,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            version: ConfigVersion::V1,
            durations: default_durations(),
            min_period: default_min_period(),
            max_period: default_max_period(),
            injection: None,
            cache: CachePolicy::default(),
        }
    }
}

impl PrepareConfig {
    /// Injection settings when at least one planet is requested
    pub fn active_injection(&self) -> Option<&InjectionConfig> {
        self.injection.as_ref().filter(|inj| inj.count > 0)
    }
}

fn default_durations() -> Vec<f64> {
    vec![0.2, 0.4, 0.6]
}

fn default_min_period() -> f64 {
    50.0
}

fn default_max_period() -> f64 {
    400.0
}

/// Injection settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InjectionConfig {
    /// Number of planets to draw
    pub count: u32,

    /// Random seed (fresh entropy when absent)
    #[serde(default)]
    pub seed: Option<u64>,

    /// Stellar mass (solar masses)
    #[serde(default = "default_stellar")]
    pub mstar: f64,

    /// Stellar radius (solar radii)
    #[serde(default = "default_stellar")]
    pub rstar: f64,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            count: 0,
            seed: None,
            mstar: default_stellar(),
            rstar: default_stellar(),
        }
    }
}

fn default_stellar() -> f64 {
    1.0
}

/// Cache policy per composed stage
///
/// The root download stage is never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub inject: bool,
    pub prepare: bool,
    pub likelihood: bool,
    pub one_d: bool,
    pub two_d: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            inject: false,
            prepare: false,
            likelihood: false,
            one_d: true,
            two_d: false,
        }
    }
}

/// Worker pool description (the controller "profile")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolProfile {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Profile name, used in logs
    #[serde(default = "default_profile_name")]
    pub name: String,

    /// Number of concurrent workers
    pub workers: usize,

    /// How workers execute units
    #[serde(default)]
    pub mode: PoolMode,

    /// Executable for subprocess workers (defaults to the current binary)
    #[serde(default)]
    pub worker_command: Option<PathBuf>,

    /// Cancel the remaining units after the first failure
    #[serde(default)]
    pub fail_fast: bool,
}

impl PoolProfile {
    /// Local in-process pool with the given worker count
    pub fn local(workers: usize) -> Self {
        Self {
            version: ConfigVersion::V1,
            name: default_profile_name(),
            workers,
            mode: PoolMode::InProcess,
            worker_command: None,
            fail_fast: false,
        }
    }
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Worker execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    /// Units run on blocking threads of the dispatching process
    #[default]
    InProcess,
    /// Each unit runs in a child `worker` process
    Subprocess,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_defaults() {
        let config: PrepareConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.durations, vec![0.2, 0.4, 0.6]);
        assert_eq!(config.min_period, 50.0);
        assert_eq!(config.max_period, 400.0);
        assert!(config.active_injection().is_none());
        assert!(config.cache.one_d);
        assert!(!config.cache.two_d);
    }

    #[test]
    fn test_zero_count_injection_is_inactive() {
        let config = PrepareConfig {
            injection: Some(InjectionConfig::default()),
            ..Default::default()
        };
        assert!(config.active_injection().is_none());
    }

    #[test]
    fn test_pool_mode_snake_case() {
        let profile: PoolProfile =
            serde_json::from_str(r#"{"workers": 4, "mode": "subprocess"}"#).unwrap();
        assert_eq!(profile.mode, PoolMode::Subprocess);
        assert_eq!(profile.name, "default");
        assert!(!profile.fail_fast);
    }
}
