//! CLI routing and command dispatch.

use crate::core::config;
use crate::core::registry::Registry;
use crate::models::config::ConfigFile;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub mod keys;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub config_path: PathBuf,
    pub config: ConfigFile,
    pub registry: Registry,
}

impl CliContext {
    pub fn new(config_path: PathBuf, config: ConfigFile) -> Result<Self> {
        let timeout = Duration::from_secs(config.settings.http_timeout_secs);
        let registry =
            Registry::builtin(&config.endpoints, timeout).context("build provider registry")?;
        Ok(Self {
            config_path,
            config,
            registry,
        })
    }
}

#[derive(Parser, Debug)]
#[command(name = "cloud-keys", version, about = "Inventory and rotate cloud API credentials")]
pub struct Cli {
    /// Configuration file (default: $CLOUD_KEYS_CONFIG, then ./cloud-keys.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config_path = config::resolve_path(self.config);
        let config_file = config::load(&config_path)?;
        let ctx = CliContext::new(config_path, config_file)?;

        match self.command {
            Commands::List(args) => keys::run_list(&ctx, args),
            Commands::Create(args) => keys::run_create(&ctx, args),
            Commands::Delete(args) => keys::run_delete(&ctx, args),
            Commands::Providers => keys::run_providers(&ctx),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List keys across all configured providers
    List(keys::ListArgs),
    /// Create a key for an account
    Create(keys::CreateArgs),
    /// Delete a key
    Delete(keys::DeleteArgs),
    /// Show registered and configured providers
    Providers,
}
