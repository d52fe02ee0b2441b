//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Field separator for exported windows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
}

impl Delimiter {
    pub fn byte(self) -> u8 {
        match self {
            Self::Comma => b',',
            Self::Tab => b'\t',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Comma => "csv",
            Self::Tab => "tsv",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "megscope")]
#[command(author, version, about = "Operator console for MEG acquisition devices", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Acquisition service base URL (overrides config)
    #[arg(long, global = true, env = "MEGSCOPE_URL")]
    pub url: Option<String>,

    /// Device channel count (overrides config)
    #[arg(long, global = true)]
    pub channels: Option<usize>,

    /// Use a built-in simulated service instead of the network
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Interactive waveform console (default)
    Tui,

    /// Probe the service once and print connection health
    Status {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Acquire for a fixed time and export the captured window
    Capture {
        /// Capture duration in seconds
        #[arg(short, long, default_value = "5")]
        seconds: u64,

        /// Output file (defaults to a timestamped file in the export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field separator
        #[arg(short, long, value_enum, default_value = "comma")]
        delimiter: Delimiter,
    },

    /// Print the sensor activation grid
    Sensors {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
