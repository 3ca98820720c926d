mod cli;
mod display;
mod error;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, RunCommand};
use log::debug;
use nufus::config::Config;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

#[tokio::main]
async fn main() -> Result<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let config = match args.config.as_deref() {
        Some(path) => read_config_from_toml(path)?,
        None => read_config_from_toml(&default_config_path()?)?,
    };
    debug!("config: {config:?}");

    if let Some(command) = args.command {
        command.run(config).await?;
    }
    Ok(())
}

fn default_config_path() -> Result<PathBuf> {
    // Linux: ~/.config/nufus/config.toml
    // macOS: ~/Library/Application Support/nufus/config.toml
    let config_dir = dirs::config_dir().context("No config directory on this platform")?;
    Ok(config_dir.join("nufus").join("config.toml"))
}

/// Read the config, falling back to defaults when the file does not exist.
fn read_config_from_toml(file_path: &Path) -> Result<Config> {
    match std::fs::read_to_string(file_path) {
        Ok(contents) => toml::from_str(&contents)
            .with_context(|| format!("Invalid TOML in config file {}", file_path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No config at {}, using defaults", file_path.display());
            Ok(Config::default())
        }
        Err(e) => Err(e).with_context(|| format!("Error reading config file {}", file_path.display())),
    }
}
