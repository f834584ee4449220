//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Data Logger - interval-driven metric sampling
#[derive(Parser, Debug)]
#[command(
    name = "data-logger",
    author,
    version,
    about = "Interval-driven metric sampling and logging",
    long_about = "Samples named metrics (load average, ping, sensors) on independent intervals.\n\n\
                  Each scheduling cycle dispatches the due items to a worker pool, harvests \n\
                  the finished samples and hands one batch per cycle to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DATA_LOGGER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "DATA_LOGGER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the poller until interrupted
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Load the items into a poller and write them back out
    Export(ExportArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "data_logger.toml",
        env = "DATA_LOGGER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override polling_threads from configuration
    #[arg(long, env = "DATA_LOGGER_WORKERS")]
    pub workers: Option<usize>,

    /// Stop after this many cycles (0 = run until interrupted)
    #[arg(long, default_value = "0", env = "DATA_LOGGER_CYCLES")]
    pub cycles: u64,

    /// Validate configuration and exit without polling
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "DATA_LOGGER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "data_logger.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "data_logger.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `export` command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "data_logger.toml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "toml")]
    pub format: ExportFormat,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Export serialization format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Toml,
    Json,
}

impl From<ExportFormat> for config_loader::ConfigFormat {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Toml => Self::Toml,
            ExportFormat::Json => Self::Json,
        }
    }
}
