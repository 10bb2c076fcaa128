//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// push-relay - telemetry threshold alerts to mobile push notifications
#[derive(Parser, Debug)]
#[command(
    name = "push-relay",
    author,
    version,
    about = "Telemetry to push-notification relay",
    long_about = "Subscribes to sensor telemetry on an MQTT broker, evaluates threshold \n\
                  rules, and fans alerts out as push notifications to every device \n\
                  registered through the HTTP ingress."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Override the ingress listen address from configuration
    #[arg(long, env = "RELAY_BIND")]
    pub bind: Option<String>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "RELAY_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Override the internal channel capacity
    #[arg(long, env = "RELAY_CHANNEL_CAPACITY")]
    pub channel_capacity: Option<usize>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show rule templates
    #[arg(long)]
    pub templates: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
