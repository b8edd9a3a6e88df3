//! `worker` command implementation.

use anyhow::{Context, Result};

use crate::cli::WorkerArgs;

/// Execute the `worker` command
pub async fn run_worker(args: &WorkerArgs) -> Result<()> {
    let artifact = args.artifact.clone();
    tokio::task::spawn_blocking(move || workunit::execute(&artifact))
        .await
        .context("Worker thread failed")?
        .with_context(|| format!("Work unit {} failed", args.artifact.display()))?;
    Ok(())
}
