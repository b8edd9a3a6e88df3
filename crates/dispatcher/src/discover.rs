//! Work-unit discovery by glob pattern

use std::path::PathBuf;

use tracing::{debug, instrument, warn};

use crate::error::DispatcherError;

/// Expand `pattern` to the absolute paths of matching files, sorted and
/// de-duplicated. No match yields an empty list.
#[instrument(name = "discover_units")]
pub fn discover(pattern: &str) -> Result<Vec<PathBuf>, DispatcherError> {
    let entries =
        glob::glob(pattern).map_err(|e| DispatcherError::invalid_pattern(pattern, e.to_string()))?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => paths.push(std::path::absolute(&path)?),
            Ok(path) => debug!(path = %path.display(), "skipping non-file match"),
            Err(e) => warn!(path = %e.path().display(), error = %e.error(), "unreadable match skipped"),
        }
    }
    paths.sort();
    paths.dedup();

    debug!(units = paths.len(), "units discovered");
    Ok(paths)
}
