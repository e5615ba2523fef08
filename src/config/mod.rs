use crate::models::UserConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Configuration manager for loading and saving the YAML user settings file.
///
/// Settings live in a single file under the data directory
/// (`STEGOSIGHT Config.yaml`). A missing file yields defaults; a malformed
/// file is an error rather than silently resetting the user's preferences.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    user_config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager rooted at `config_dir`, creating the directory
    /// if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {config_dir}"))?;
        }

        Ok(Self {
            user_config_path: config_dir.join("STEGOSIGHT Config.yaml"),
            config_dir,
        })
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    /// Load the user configuration, or defaults if the file doesn't exist.
    pub fn load_user_config(&self) -> Result<UserConfig> {
        if !self.user_config_path.exists() {
            tracing::warn!(
                "user config not found at {}, using defaults",
                self.user_config_path
            );
            return Ok(UserConfig::default());
        }

        let contents = fs::read_to_string(&self.user_config_path)
            .with_context(|| format!("Failed to read user config: {}", self.user_config_path))?;

        let config: UserConfig = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse user config: {}", self.user_config_path))?;

        tracing::info!("loaded user config from {}", self.user_config_path);
        Ok(config)
    }

    /// Save the user configuration.
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml =
            serde_yaml_ng::to_string(config).context("Failed to serialize user config to YAML")?;

        fs::write(&self.user_config_path, yaml)
            .with_context(|| format!("Failed to write user config: {}", self.user_config_path))?;

        tracing::info!("saved user config to {}", self.user_config_path);
        Ok(())
    }
}
