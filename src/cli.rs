//! Command-line interface using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::ENV_CONFIG_PATH;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// One JSON object per event, for log aggregation.
    Json,
}

/// Relay new Waze traffic alerts to a chat webhook.
#[derive(Parser, Debug)]
#[command(name = "waze-alerts")]
#[command(version)]
#[command(about = "Relay new Waze traffic alerts to a chat webhook")]
pub struct Cli {
    /// Optional YAML configuration file. Environment variables are used alone when omitted.
    #[arg(short = 'c', long = "config", env = ENV_CONFIG_PATH)]
    pub config: Option<PathBuf>,

    /// Validate configuration and exit.
    #[arg(long = "validate")]
    pub validate: bool,

    /// Log format: text or json.
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, env = "LOG_FORMAT")]
    pub log_format: LogFormat,
}
