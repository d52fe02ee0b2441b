//! Config command implementation.

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;

pub fn cmd_config(action: ConfigAction, effective: &Config) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let content =
                toml::to_string_pretty(effective).context("Failed to serialize config")?;
            print!("{content}");
        }
        ConfigAction::Path => {
            println!("{}", Config::path().display());
        }
        ConfigAction::Init { force } => {
            let path = Config::path();
            if path.exists() && !force {
                bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            Config::default().save_to(&path)?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}
