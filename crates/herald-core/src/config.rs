use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HeraldError, Result};

/// Top-level configuration for a Herald host.
///
/// Loaded from `~/.herald/config.toml` by default. Every section is optional
/// and falls back to its defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeraldConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub cooldowns: CooldownConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl HeraldConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HeraldConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| HeraldError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Chat client identity and command surface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Actor id of the bot owner. Owners bypass cooldowns and may run
    /// owner-only actions.
    pub owner_id: u64,
    /// Additional actors treated as owners.
    pub co_owner_ids: Vec<u64>,
    /// Text prefix that marks a message as a command.
    pub prefix: String,
    /// Optional second prefix accepted alongside `prefix`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_prefix: Option<String>,
    /// Keyword that asks a command for its help text instead of running it.
    pub help_word: String,
    /// Workspace that structured commands are published to instead of globally.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forced_workspace_id: Option<u64>,
    /// Workspaces that receive development builds of structured commands.
    pub dev_workspace_ids: Vec<u64>,
    /// When true the host publishes structured commands itself.
    pub manual_publish: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            owner_id: 0,
            co_owner_ids: Vec::new(),
            prefix: "!".to_string(),
            alt_prefix: None,
            help_word: "help".to_string(),
            forced_workspace_id: None,
            dev_workspace_ids: Vec::new(),
            manual_publish: false,
        }
    }
}

/// Cooldown store maintenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// Seconds between sweeps of expired cooldown entries.
    pub sweep_interval_secs: u64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 300,
        }
    }
}

/// Action registry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Number of top-level actions above which lookups go through a
    /// name index instead of a linear scan.
    pub index_threshold: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            index_threshold: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = HeraldConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.client.prefix, "!");
        assert_eq!(config.client.help_word, "help");
        assert_eq!(config.client.owner_id, 0);
        assert!(config.client.alt_prefix.is_none());
        assert!(!config.client.manual_publish);
        assert_eq!(config.cooldowns.sweep_interval_secs, 300);
        assert_eq!(config.registry.index_threshold, 20);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[client]
owner_id = 1001
co_owner_ids = [1002, 1003]
prefix = "?"
alt_prefix = "@herald "
help_word = "aide"
forced_workspace_id = 555
dev_workspace_ids = [777]
manual_publish = true

[cooldowns]
sweep_interval_secs = 60

[registry]
index_threshold = 8
"#;
        let file = create_temp_config(content);
        let config = HeraldConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.client.owner_id, 1001);
        assert_eq!(config.client.co_owner_ids, vec![1002, 1003]);
        assert_eq!(config.client.prefix, "?");
        assert_eq!(config.client.alt_prefix.as_deref(), Some("@herald "));
        assert_eq!(config.client.help_word, "aide");
        assert_eq!(config.client.forced_workspace_id, Some(555));
        assert_eq!(config.client.dev_workspace_ids, vec![777]);
        assert!(config.client.manual_publish);
        assert_eq!(config.cooldowns.sweep_interval_secs, 60);
        assert_eq!(config.registry.index_threshold, 8);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let content = r#"
[client]
owner_id = 42
"#;
        let file = create_temp_config(content);
        let config = HeraldConfig::load(file.path()).unwrap();
        assert_eq!(config.client.owner_id, 42);
        assert_eq!(config.client.prefix, "!");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.registry.index_threshold, 20);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = HeraldConfig::load_or_default(Path::new("/nonexistent/herald.toml"));
        assert_eq!(config.client.prefix, "!");
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let file = create_temp_config("this is {{ not valid TOML");
        assert!(matches!(
            HeraldConfig::load(file.path()),
            Err(HeraldError::Config(_))
        ));
    }

    #[test]
    fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");

        let mut config = HeraldConfig::default();
        config.client.owner_id = 9;
        config.client.forced_workspace_id = Some(12);
        config.save(&path).unwrap();

        assert!(path.exists());
        let reloaded = HeraldConfig::load(&path).unwrap();
        assert_eq!(reloaded.client.owner_id, 9);
        assert_eq!(reloaded.client.forced_workspace_id, Some(12));
        assert!(reloaded.client.alt_prefix.is_none());
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = HeraldConfig::load(file.path()).unwrap();
        assert_eq!(config.client.help_word, "help");
        assert_eq!(config.cooldowns.sweep_interval_secs, 300);
    }
}
