//! Terminal operator console for MEG acquisition devices.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tui` | Interactive waveform console (default) |
//! | `status` | Probe the service once |
//! | `capture` | Headless acquisition followed by an export |
//! | `sensors` | Print the 8×8 sensor activation grid |
//! | `config` | Manage `~/.config/megscope/config.toml` |
//!
//! # Environment Variables
//!
//! - `MEGSCOPE_URL`: service base URL (overridden by `--url`)
//! - `RUST_LOG`: log filter when neither `-v` nor `-q` is given

mod cli;
mod commands;
mod config;
#[cfg(feature = "tui")]
mod tui;

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.clone().unwrap_or(Commands::Tui);

    init_tracing(&cli, matches!(command, Commands::Tui))?;

    let mut config = Config::load();
    config.apply_overrides(cli.url.clone(), cli.channels);

    let service_label = if cli.simulate {
        "simulated".to_string()
    } else {
        config.service_url.clone()
    };

    match command {
        Commands::Tui => run_tui(&config, cli.simulate).await,
        Commands::Status { format } => {
            let service = commands::connect_service(&config, cli.simulate)?;
            commands::cmd_status(service.as_ref(), &service_label, format).await
        }
        Commands::Capture {
            seconds,
            output,
            delimiter,
        } => {
            let service = commands::connect_service(&config, cli.simulate)?;
            commands::cmd_capture(
                service,
                &config,
                Duration::from_secs(seconds),
                output,
                delimiter,
                cli.quiet,
            )
            .await
        }
        Commands::Sensors { format } => {
            let service = commands::connect_service(&config, cli.simulate)?;
            commands::cmd_sensors(service.as_ref(), format).await
        }
        Commands::Config { action } => commands::cmd_config(action, &config),
    }
}

#[cfg(feature = "tui")]
async fn run_tui(config: &Config, simulate: bool) -> Result<()> {
    let service = commands::connect_service(config, simulate)?;
    tui::run(service, config).await
}

#[cfg(not(feature = "tui"))]
async fn run_tui(_config: &Config, _simulate: bool) -> Result<()> {
    anyhow::bail!("megscope was built without the `tui` feature")
}

/// Install the tracing subscriber.
///
/// The TUI owns the terminal, so its logs go to a file in the data directory.
fn init_tracing(cli: &Cli, to_file: bool) -> Result<()> {
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if to_file {
        let path = log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("megscope")
        .join("megscope.log")
}
