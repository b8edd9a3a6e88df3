//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Turnstile - transit-search work-unit preparation and dispatch
#[derive(Parser, Debug)]
#[command(
    name = "turnstile",
    author,
    version,
    about = "Transit-search work-unit preparation and dispatch",
    long_about = "Prepares per-target transit-search work units (optionally with injected \n\
                  synthetic planets) and dispatches batches of them to a worker pool."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TURNSTILE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "TURNSTILE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", global = true, env = "TURNSTILE_METRICS_PORT")]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prepare the work unit of one target
    Prepare(PrepareArgs),

    /// Dispatch every work unit matching a pattern to a worker pool
    Search(SearchArgs),

    /// Execute one work unit (used by subprocess pools)
    Worker(WorkerArgs),

    /// Show the query and stage chain of a persisted work unit
    Inspect(InspectArgs),

    /// Validate a preparation config or pool profile without running
    Validate(ValidateArgs),
}

/// Arguments for the `prepare` command
#[derive(Parser, Debug, Clone)]
pub struct PrepareArgs {
    /// Kepler Input Catalog identifier
    pub kicid: u64,

    /// Directory holding `<kicid>/*.json` light curves
    pub archive_root: PathBuf,

    /// Staging directory for raw data
    pub data_root: PathBuf,

    /// Directory receiving the work unit
    pub results_root: PathBuf,

    /// Preparation config file (TOML or JSON)
    #[arg(short, long, env = "TURNSTILE_PREPARE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Trial transit durations in days (comma separated)
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub durations: Option<Vec<f64>>,

    /// Minimum orbital period in days
    #[arg(long)]
    pub min_period: Option<f64>,

    /// Maximum orbital period in days
    #[arg(long)]
    pub max_period: Option<f64>,

    /// Random seed for injected planets
    #[arg(short, long, env = "TURNSTILE_SEED")]
    pub seed: Option<u64>,

    /// Number of synthetic planets to inject
    #[arg(long)]
    pub injections: Option<u32>,

    /// Stellar mass in solar masses
    #[arg(long)]
    pub mstar: Option<f64>,

    /// Stellar radius in solar radii
    #[arg(long)]
    pub rstar: Option<f64>,
}

/// Arguments for the `search` command
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Glob pattern selecting `pipeline.bin` artifacts
    pub file_pattern: String,

    /// Worker pool profile (TOML or JSON); a local pool when absent
    #[arg(short, long, env = "TURNSTILE_PROFILE")]
    pub profile: Option<PathBuf>,
}

/// Arguments for the `worker` command
#[derive(Parser, Debug, Clone)]
pub struct WorkerArgs {
    /// Path to a `pipeline.bin` artifact
    pub artifact: PathBuf,
}

/// Arguments for the `inspect` command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Path to a `pipeline.bin` artifact
    pub artifact: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "prepare.toml")]
    pub config: PathBuf,

    /// Treat the file as a worker pool profile
    #[arg(long)]
    pub profile: bool,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}
