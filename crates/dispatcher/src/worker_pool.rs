//! WorkerPool trait - Dispatcher execution interface

use std::path::Path;

use contracts::ContractError;

/// Executes work units
#[trait_variant::make(WorkerPool: Send)]
pub trait LocalWorkerPool {
    /// Pool name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Number of units that may run concurrently
    fn workers(&self) -> usize;

    /// Run the unit stored at `unit` to completion
    ///
    /// # Errors
    /// Whatever loading or executing the unit raised.
    async fn execute(&self, unit: &Path) -> Result<(), ContractError>;
}
