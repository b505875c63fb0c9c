//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Emergency preemption signal controller for a four-way intersection
#[derive(Parser, Debug)]
#[command(
    name = "signal-preempt",
    author,
    version,
    about = "Emergency preemption signal controller",
    long_about = "Runs a four-way intersection on a fixed round-robin cycle and grants \n\
                  immediate right-of-way to a lane reporting an emergency vehicle.\n\n\
                  Detections are read from a replayed recording; decisions are \n\
                  dispatched to the sinks listed in the configuration."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SIGNAL_PREEMPT_VERBOSE")]
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
        env = "SIGNAL_PREEMPT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Filter used when `RUST_LOG` is unset
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the controller
    Run(RunArgs),

    /// Validate a configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "controller.toml",
        env = "SIGNAL_PREEMPT_CONFIG"
    )]
    pub config: PathBuf,

    /// JSON Lines detection recording to replay
    #[arg(long, env = "SIGNAL_PREEMPT_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = recorded speed)
    #[arg(long, default_value = "1.0")]
    pub speed: f64,

    /// Restart the recording when it ends
    #[arg(long = "loop")]
    pub replay_loop: bool,

    /// Override the tick interval from configuration (milliseconds)
    #[arg(long, env = "SIGNAL_PREEMPT_TICK_MS")]
    pub tick_ms: Option<u64>,

    /// Maximum number of ticks to run (0 = unlimited)
    #[arg(long, default_value = "0", env = "SIGNAL_PREEMPT_MAX_TICKS")]
    pub max_ticks: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "SIGNAL_PREEMPT_TIMEOUT")]
    pub timeout: u64,

    /// Dispatch every tick to sinks instead of transitions only
    #[arg(long)]
    pub every_tick: bool,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for internal queues
    #[arg(long, default_value = "256", env = "SIGNAL_PREEMPT_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SIGNAL_PREEMPT_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "controller.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "controller.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink parameters
    #[arg(long)]
    pub sinks: bool,
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
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
