//! CLI argument definitions for the Herald console host.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Herald: dispatch chat commands typed on stdin through the action core.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Actor id the console speaks as. Defaults to the configured owner.
    #[arg(short = 'a', long = "actor")]
    pub actor: Option<u64>,

    /// Treat input as coming from this workspace instead of a direct
    /// conversation.
    #[arg(short = 'w', long = "workspace")]
    pub workspace: Option<u64>,

    /// Surface (channel) id attached to every invocation.
    #[arg(short = 's', long = "surface", default_value_t = 1)]
    pub surface: u64,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > HERALD_CONFIG env var > ~/.herald/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("HERALD_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".herald").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".herald").join("config.toml");
    }
    PathBuf::from("config.toml")
}
