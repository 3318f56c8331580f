//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config file used when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG: &str = "etc/phmon.toml";

#[derive(Parser, Debug)]
#[command(name = "phmon", version, about = "Soil pH monitor and dosing controller")]
pub struct Cli {
    /// Path to config TOML (defaults to etc/phmon.toml when present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra crop catalog CSV with headers crop,min_ph,max_ph
    #[arg(long = "crops-csv", value_name = "FILE")]
    pub crops_csv: Option<PathBuf>,

    /// Override [store].dir
    #[arg(long = "store-dir", value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Override [store].user
    #[arg(long, value_name = "ID")]
    pub user: Option<String>,

    /// Emit JSON (logs and command output) instead of text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample the simulated probe on a timer, classify and dose
    Monitor {
        /// Stop after this many ticks (default: run until Ctrl-C)
        #[arg(long)]
        ticks: Option<u64>,
        /// Override [ticker].interval_ms
        #[arg(long = "interval-ms", value_name = "MS")]
        interval_ms: Option<u64>,
        /// Select a crop from the catalog before starting
        #[arg(long)]
        crop: Option<String>,
        /// Seed for the simulated probe (overrides [simulator].seed)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Latest reading, classification and last dose
    Status {
        /// Evaluate against this crop instead of the configured one
        #[arg(long)]
        crop: Option<String>,
    },
    /// Average/min/max over retained samples and dose counts
    Stats,
    /// Forward-filled chart series anchored to now
    Series {
        /// Zoom factor in [0.5, 4.0]
        #[arg(long)]
        zoom: Option<f64>,
        /// Print every point instead of only the visible range
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,
    },
    /// Reading log (newest first) or recent doses
    Log {
        /// Time range: 24h, 7d or month
        #[arg(long, default_value = "24h")]
        range: String,
        /// Show recent doses instead of readings
        #[arg(long, action = ArgAction::SetTrue)]
        doses: bool,
        /// Maximum entries to print
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the crop catalog
    Crops,
    /// Delete every stored reading and dose for the user
    Clear {
        /// Confirm the deletion
        #[arg(long, action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Health check for operational monitoring
    Health,
}
