//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{PoolMode, PoolProfile, PrepareConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ConfigSummary {
    Prepare {
        durations: Vec<f64>,
        min_period: f64,
        max_period: f64,
        injections: u32,
    },
    Profile {
        name: String,
        workers: usize,
        mode: PoolMode,
        fail_fast: bool,
    },
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::config_validation(result.error.unwrap_or_default()).into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return invalid(config_path, format!("File not found: {}", args.config.display()));
    }

    let loaded = if args.profile {
        ConfigLoader::load_profile(&args.config).map(|p| (profile_warnings(&p), profile_summary(p)))
    } else {
        ConfigLoader::load_prepare(&args.config).map(|c| (prepare_warnings(&c), prepare_summary(c)))
    };

    match loaded {
        Ok((warnings, summary)) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: if warnings.is_empty() {
                None
            } else {
                Some(warnings)
            },
            summary: Some(summary),
        },
        Err(e) => invalid(config_path, e.to_string()),
    }
}

fn invalid(config_path: String, error: String) -> ValidationResult {
    ValidationResult {
        valid: false,
        config_path,
        error: Some(error),
        warnings: None,
        summary: None,
    }
}

fn prepare_summary(config: PrepareConfig) -> ConfigSummary {
    ConfigSummary::Prepare {
        injections: config.active_injection().map_or(0, |inj| inj.count),
        durations: config.durations,
        min_period: config.min_period,
        max_period: config.max_period,
    }
}

fn profile_summary(profile: PoolProfile) -> ConfigSummary {
    ConfigSummary::Profile {
        name: profile.name,
        workers: profile.workers,
        mode: profile.mode,
        fail_fast: profile.fail_fast,
    }
}

/// Collect configuration warnings (non-fatal issues)
fn prepare_warnings(config: &PrepareConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(injection) = config.active_injection() {
        if injection.seed.is_none() {
            warnings.push("injection.seed is not set - injected planets are not reproducible".to_string());
        }
    } else if config.injection.is_some() {
        warnings.push("injection.count is 0 - no planets will be injected".to_string());
    }

    warnings
}

fn profile_warnings(profile: &PoolProfile) -> Vec<String> {
    let mut warnings = Vec::new();

    if profile.mode == PoolMode::InProcess && profile.worker_command.is_some() {
        warnings.push("worker_command is ignored by in_process pools".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        match &result.summary {
            Some(ConfigSummary::Prepare {
                durations,
                min_period,
                max_period,
                injections,
            }) => {
                println!("\n  Durations: {:?}", durations);
                println!("  Periods: {} - {}", min_period, max_period);
                println!("  Injected planets: {}", injections);
            }
            Some(ConfigSummary::Profile {
                name,
                workers,
                mode,
                fail_fast,
            }) => {
                println!("\n  Pool: {}", name);
                println!("  Workers: {} ({:?})", workers, mode);
                println!("  Fail fast: {}", fail_fast);
            }
            None => {}
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn args(path: std::path::PathBuf, profile: bool) -> ValidateArgs {
        ValidateArgs {
            config: path,
            profile,
            json: true,
        }
    }

    #[test]
    fn test_valid_prepare_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prepare.toml");
        fs::write(&path, "durations = [0.2, 0.4]\n[injection]\ncount = 2\n").unwrap();

        let result = validate_config(&args(path, false));
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings[0].contains("seed"));
    }

    #[test]
    fn test_invalid_period_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prepare.toml");
        fs::write(&path, "min_period = 400.0\nmax_period = 50.0\n").unwrap();

        let result = validate_config(&args(path, false));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("max_period"));
    }

    #[test]
    fn test_profile() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pool.json");
        fs::write(&path, r#"{"workers": 8, "mode": "subprocess"}"#).unwrap();

        let result = validate_config(&args(path, true));
        assert!(result.valid);
        assert!(matches!(
            result.summary,
            Some(ConfigSummary::Profile { workers: 8, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&args("/nonexistent.toml".into(), false));
        assert!(!result.valid);
    }
}
