pub mod config;
pub mod pid;

use std::path::Path;

use clap::{Parser, Subcommand};

use lp_domain::config::Config;

/// Launchpad: provisions throwaway credentials and runs a deploy with them.
#[derive(Debug, Parser)]
#[command(name = "launchpad", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "LP_CONFIG";

/// Load the configuration from the path in `LP_CONFIG` (or `config.toml`
/// by default).  Returns the parsed [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.toml".into());
    let config = Config::load(Path::new(&config_path))?;
    Ok((config, config_path))
}
