//! Preparation entry point
//!
//! Stages the target's raw data, optionally draws an injected system,
//! composes the chain and persists the unit.

use std::fs;
use std::path::PathBuf;

use analysis::{PipelineComposer, PreparedDownload};
use config_loader::validate_prepare;
use contracts::{ContractError, PrepareConfig, Query};
use rand::Rng;
use tracing::{info, instrument};

use crate::store::{persist, WorkUnit};

/// Download manifest written by the root stage's bootstrap
pub const DOWNLOAD_FILE: &str = "download.bin";

/// Stage cache directory inside a unit
pub const CACHE_DIR: &str = "cache";

/// Validation output directory inside a unit
pub const RESULTS_DIR: &str = "results";

/// Everything needed to prepare one target
#[derive(Debug, Clone)]
pub struct PrepareRequest {
    pub kicid: u64,
    /// Directory holding `<kicid>/*.json` light curves
    pub archive_root: PathBuf,
    /// Staging directory for raw data
    pub data_root: PathBuf,
    /// Unit directory
    pub results_root: PathBuf,
    pub config: PrepareConfig,
}

/// Prepare one target and persist its work unit.
///
/// `rng` is only drawn from when the config requests injected planets.
///
/// # Errors
/// `Configuration` for invalid settings (checked before touching the disk),
/// `Path` for missing archive data or uncreatable directories, and any
/// store error from [`persist`].
#[instrument(name = "prepare_target", skip(request, rng), fields(kicid = request.kicid))]
pub fn prepare<R: Rng + ?Sized>(
    request: PrepareRequest,
    rng: &mut R,
) -> Result<WorkUnit, ContractError> {
    let PrepareRequest {
        kicid,
        archive_root,
        data_root,
        results_root,
        config,
    } = request;
    validate_prepare(&config)?;

    fs::create_dir_all(&results_root)
        .map_err(|e| ContractError::path(&results_root, e.to_string()))?;
    let results_root = std::path::absolute(&results_root)
        .map_err(|e| ContractError::path(&results_root, e.to_string()))?;

    let prepared_file = results_root.join(DOWNLOAD_FILE);
    PreparedDownload::prepare(&prepared_file, &archive_root, &data_root, kicid)?;

    let mut query = Query::new(
        kicid,
        &prepared_file,
        config.durations.iter().copied(),
        config.min_period,
        config.max_period,
        results_root.join(RESULTS_DIR),
    )?;

    if let Some(injection) = config.active_injection() {
        let system = prior::generate_system(
            rng,
            injection.count as usize,
            injection.mstar,
            injection.rstar,
            config.min_period,
            config.max_period,
        )?;
        info!(planets = system.len(), "injecting synthetic planets");
        query = query.with_injection(system);
    }

    let pipeline = PipelineComposer::new(&prepared_file, results_root.join(CACHE_DIR))
        .with_injection(query.injection.is_some())
        .cache_policy(config.cache)
        .build()?;

    persist(&results_root, query, pipeline)
}
