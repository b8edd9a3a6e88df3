//! `prepare` command implementation.

use anyhow::{Context, Result};
use contracts::{InjectionConfig, PrepareConfig};
use tracing::info;
use workunit::{prepare, PrepareRequest};

use crate::cli::PrepareArgs;
use crate::error::CliError;

/// Execute the `prepare` command
pub fn run_prepare(args: &PrepareArgs) -> Result<()> {
    let config = build_config(args)?;
    let seed = config.active_injection().and_then(|inj| inj.seed);

    let request = PrepareRequest {
        kicid: args.kicid,
        archive_root: args.archive_root.clone(),
        data_root: args.data_root.clone(),
        results_root: args.results_root.clone(),
        config,
    };
    let unit = prepare(request, &mut prior::seeded_rng(seed))
        .with_context(|| format!("Failed to prepare target {}", args.kicid))?;

    info!(
        kicid = args.kicid,
        stages = unit.pipeline().len(),
        artifact = %unit.artifact_path().display(),
        "Work unit prepared"
    );
    println!("{}", unit.artifact_path().display());
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied
fn build_config(args: &PrepareArgs) -> Result<PrepareConfig> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()).into());
            }
            config_loader::ConfigLoader::load_prepare(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => PrepareConfig::default(),
    };

    if let Some(durations) = &args.durations {
        config.durations = durations.clone();
    }
    if let Some(min_period) = args.min_period {
        config.min_period = min_period;
    }
    if let Some(max_period) = args.max_period {
        config.max_period = max_period;
    }

    let overrides_injection = args.injections.is_some()
        || args.seed.is_some()
        || args.mstar.is_some()
        || args.rstar.is_some();
    if overrides_injection {
        let injection = config.injection.get_or_insert_with(InjectionConfig::default);
        if let Some(count) = args.injections {
            injection.count = count;
        }
        if let Some(seed) = args.seed {
            injection.seed = Some(seed);
        }
        if let Some(mstar) = args.mstar {
            injection.mstar = mstar;
        }
        if let Some(rstar) = args.rstar {
            injection.rstar = rstar;
        }
    }

    Ok(config)
}
