//! `search` command implementation.

use anyhow::{Context, Result};
use dispatcher::{BatchContext, BatchReport};
use observability::BatchStatsAggregator;
use tracing::{info, warn};

use crate::cli::SearchArgs;
use crate::error::CliError;

/// Execute the `search` command
pub async fn run_search(args: &SearchArgs) -> Result<()> {
    info!(pattern = %args.file_pattern, "Dispatching work units");

    let ctx = BatchContext::new();
    let shutdown_ctx = ctx.clone();
    let shutdown = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling pending units...");
            shutdown_ctx.cancel();
        }
    });

    let result =
        dispatcher::run_with_context(&args.file_pattern, args.profile.as_deref(), &ctx).await;
    shutdown.abort();
    let report = result.context("Batch dispatch failed")?;

    print_summary(&report);

    let failed = report.failed().len() + report.cancelled().len();
    if failed > 0 {
        return Err(CliError::batch_failed(failed, report.len()).into());
    }
    Ok(())
}

fn print_summary(report: &BatchReport) {
    let mut aggregator = BatchStatsAggregator::new();
    for unit in &report.units {
        aggregator.update(&unit.status, unit.duration.map(|d| d.as_secs_f64()));
    }

    println!("\nPool: {} ({:.2}s)", report.pool, report.elapsed.as_secs_f64());
    print!("{}", aggregator.summary());
    for unit in report.failed() {
        println!("  failed: {}", unit.path.display());
    }
}
