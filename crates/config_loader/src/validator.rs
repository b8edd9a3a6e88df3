//! Configuration validation
//!
//! Rules:
//! - durations non-empty, finite, at least [`MIN_DURATION`] and shorter than `min_period`
//! - 0 < min_period < max_period
//! - mstar / rstar > 0
//! - workers >= 1

use contracts::{ContractError, PoolProfile, PrepareConfig};

/// Shortest accepted trial duration (days, about 1.4 minutes)
pub const MIN_DURATION: f64 = 1e-3;

/// Validate a PrepareConfig
///
/// Returns the first error encountered.
pub fn validate_prepare(config: &PrepareConfig) -> Result<(), ContractError> {
    validate_durations(&config.durations)?;
    validate_period_range(config.min_period, config.max_period)?;
    for (idx, duration) in config.durations.iter().enumerate() {
        if *duration >= config.min_period {
            return Err(ContractError::configuration(
                format!("durations[{idx}]"),
                format!(
                    "duration {duration} must be shorter than min_period ({})",
                    config.min_period
                ),
            ));
        }
    }
    validate_injection(config)?;
    Ok(())
}

/// Validate a PoolProfile
pub fn validate_profile(profile: &PoolProfile) -> Result<(), ContractError> {
    if profile.workers == 0 {
        return Err(ContractError::configuration(
            "workers",
            "worker pool needs at least one worker",
        ));
    }
    if profile.name.trim().is_empty() {
        return Err(ContractError::configuration(
            "name",
            "profile name cannot be empty",
        ));
    }
    Ok(())
}

/// Validate trial durations
pub fn validate_durations(durations: &[f64]) -> Result<(), ContractError> {
    if durations.is_empty() {
        return Err(ContractError::configuration(
            "durations",
            "at least one duration is required",
        ));
    }
    for (idx, duration) in durations.iter().enumerate() {
        if !duration.is_finite() || *duration < MIN_DURATION {
            return Err(ContractError::configuration(
                format!("durations[{idx}]"),
                format!("duration must be finite and >= {MIN_DURATION}, got {duration}"),
            ));
        }
    }
    Ok(())
}

/// Validate the period search range
pub fn validate_period_range(min_period: f64, max_period: f64) -> Result<(), ContractError> {
    if !min_period.is_finite() || min_period <= 0.0 {
        return Err(ContractError::configuration(
            "min_period",
            format!("min_period must be finite and > 0, got {min_period}"),
        ));
    }
    if !max_period.is_finite() || min_period >= max_period {
        return Err(ContractError::configuration(
            "min_period / max_period",
            format!("min_period ({min_period}) must be < max_period ({max_period})"),
        ));
    }
    Ok(())
}

/// Validate injection settings
fn validate_injection(config: &PrepareConfig) -> Result<(), ContractError> {
    let Some(injection) = config.active_injection() else {
        return Ok(());
    };
    if injection.mstar.is_nan() || injection.mstar <= 0.0 {
        return Err(ContractError::configuration(
            "injection.mstar",
            format!("stellar mass must be > 0, got {}", injection.mstar),
        ));
    }
    if injection.rstar.is_nan() || injection.rstar <= 0.0 {
        return Err(ContractError::configuration(
            "injection.rstar",
            format!("stellar radius must be > 0, got {}", injection.rstar),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::InjectionConfig;

    #[test]
    fn test_valid_config() {
        assert!(validate_prepare(&PrepareConfig::default()).is_ok());
    }

    #[test]
    fn test_inverted_period_range() {
        let config = PrepareConfig {
            min_period: 400.0,
            max_period: 50.0,
            ..Default::default()
        };
        let err = validate_prepare(&config).unwrap_err();
        assert!(err.to_string().contains("must be < max_period"));
    }

    #[test]
    fn test_equal_period_bounds() {
        assert!(validate_period_range(100.0, 100.0).is_err());
    }

    #[test]
    fn test_non_positive_min_period() {
        let err = validate_period_range(0.0, 10.0).unwrap_err();
        assert!(err.to_string().contains("min_period"));
    }

    #[test]
    fn test_empty_durations() {
        let config = PrepareConfig {
            durations: vec![],
            ..Default::default()
        };
        assert!(validate_prepare(&config).is_err());
    }

    #[test]
    fn test_negative_duration() {
        let err = validate_durations(&[0.2, -0.4]).unwrap_err();
        assert!(err.to_string().contains("durations[1]"));
    }

    #[test]
    fn test_duration_floor() {
        let config = PrepareConfig {
            durations: vec![0.2, 1e-9],
            ..Default::default()
        };
        let err = validate_prepare(&config).unwrap_err();
        assert!(err.to_string().contains("durations[1]"));
        assert!(validate_durations(&[MIN_DURATION]).is_ok());
    }

    #[test]
    fn test_duration_must_be_shorter_than_min_period() {
        let config = PrepareConfig {
            durations: vec![0.2, 60.0],
            min_period: 50.0,
            ..Default::default()
        };
        let err = validate_prepare(&config).unwrap_err();
        assert!(err.to_string().contains("shorter than min_period"));
    }

    #[test]
    fn test_bad_stellar_mass_only_matters_with_injection() {
        let mut config = PrepareConfig {
            injection: Some(InjectionConfig {
                count: 0,
                mstar: -1.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(validate_prepare(&config).is_ok());

        config.injection = Some(InjectionConfig {
            count: 2,
            mstar: -1.0,
            ..Default::default()
        });
        let err = validate_prepare(&config).unwrap_err();
        assert!(err.to_string().contains("injection.mstar"));
    }

    #[test]
    fn test_profile_needs_workers() {
        let err = validate_profile(&PoolProfile::local(0)).unwrap_err();
        assert!(err.to_string().contains("workers"));
        assert!(validate_profile(&PoolProfile::local(2)).is_ok());
    }
}
