//! Worker Executor - runs one persisted unit

use std::path::Path;

use analysis::{StageOutput, StageRegistry};
use contracts::ContractError;
use tracing::{info, instrument};

use crate::store::load;

/// Load the unit at `path` and run its pipeline with the built-in stages
pub fn execute(path: &Path) -> Result<StageOutput, ContractError> {
    execute_with(path, &StageRegistry::default())
}

/// Load the unit at `path` with `registry` and run its pipeline.
///
/// Failures propagate unchanged; nothing is retried.
#[instrument(name = "execute_unit", skip(registry), fields(unit = %path.display()))]
pub fn execute_with(path: &Path, registry: &StageRegistry) -> Result<StageOutput, ContractError> {
    let unit = load(path, registry)?;
    let kicid = unit.query().kicid;

    info!(kicid, "Starting {kicid}");
    let output = unit.pipeline().query(unit.query())?;
    info!(kicid, peaks = output.peaks.len(), "Finished {kicid}");
    Ok(output)
}
