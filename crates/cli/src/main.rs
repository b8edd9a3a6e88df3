//! # Turnstile CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 单目标 work unit 准备 (prepare)
//! - 批量分发与执行 (search / worker)
//! - 配置校验与 work unit 检查 (validate / inspect)

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use observability::{LogFormat, ObservabilityConfig};
use tracing::debug;

use cli::{Cli, Commands};
use commands::{run_inspect, run_prepare, run_search, run_validate, run_worker};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    debug!(version = env!("CARGO_PKG_VERSION"), "turnstile starting");

    let result = match &cli.command {
        Commands::Prepare(args) => run_prepare(args),
        Commands::Search(args) => run_search(args).await,
        Commands::Worker(args) => run_worker(args).await,
        Commands::Inspect(args) => run_inspect(args),
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let log_format = match cli.log_format {
        cli::LogFormat::Json => LogFormat::Json,
        cli::LogFormat::Pretty => LogFormat::Pretty,
        cli::LogFormat::Compact => LogFormat::Compact,
    };

    observability::init_with_config(ObservabilityConfig {
        log_format,
        metrics_port: Some(cli.metrics_port).filter(|p| *p != 0),
        default_log_level: default_log_level.to_string(),
    })
}
