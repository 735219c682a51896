mod cli;
mod display;
mod error;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, RunCommand};
use envburden::config::Config;
use log::debug;

use crate::error::EnvBurdenCliResult;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

#[tokio::main]
async fn main() -> Result<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let config_path = match args.config.clone() {
        Some(path) => Some(path),
        None => default_config_path(),
    };
    let mut config = match config_path {
        Some(path) => read_config_from_toml(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(root) = args.data_root.as_ref() {
        config = config.with_data_root(root);
    }
    debug!("config: {config:?}");

    if let Some(command) = args.command {
        command.run(config).await?;
    }
    Ok(())
}

/// Linux: ~/.config/envburden/config.toml, macOS: ~/Library/Application Support/envburden/config.toml
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("envburden").join("config.toml"))
}

/// Reads the configuration, falling back to the defaults when the file does not exist
fn read_config_from_toml(path: &Path) -> EnvBurdenCliResult<Config> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}
