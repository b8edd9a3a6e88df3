//! Per-unit execution status tracked by the dispatcher

use serde::{Deserialize, Serialize};

/// Lifecycle of one dispatched work unit
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum UnitStatus {
    /// Queued, not yet claimed by a worker
    #[default]
    Pending,
    /// Claimed by a worker
    Running,
    /// Pipeline query returned normally
    Succeeded,
    /// Loading or execution failed
    Failed { message: String },
    /// Never started because the batch was canceled
    Cancelled,
}

impl UnitStatus {
    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. } | Self::Cancelled)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
