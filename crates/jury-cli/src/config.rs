//! # Config Subcommand
//!
//! Validates YAML configuration files before deployment and prints the
//! effective configuration, with every default filled in.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use jury_core::JuryConfig;

/// Arguments for the `jury config` subcommand.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Load and validate a configuration file, then print it in full.
    Check {
        /// Path to the YAML configuration.
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Print the default configuration as YAML.
    Default,
}

/// Load `path`, validate it, and render the effective configuration.
pub fn check_config(path: &Path) -> Result<String> {
    let config = JuryConfig::load(path)
        .with_context(|| format!("configuration {} rejected", path.display()))?;
    config.to_yaml().context("failed to render configuration")
}

/// The default configuration as YAML.
pub fn default_config() -> Result<String> {
    JuryConfig::default()
        .to_yaml()
        .context("failed to render configuration")
}

/// Execute the config subcommand.
///
/// Returns exit code 0 on success; errors map to 1 in `main`.
pub fn run_config(args: &ConfigArgs) -> Result<u8> {
    let yaml = match &args.command {
        ConfigCommand::Check { path } => {
            let yaml = check_config(path)?;
            tracing::info!(path = %path.display(), "configuration is valid");
            yaml
        }
        ConfigCommand::Default => default_config()?,
    };
    print!("{yaml}");
    Ok(0)
}
