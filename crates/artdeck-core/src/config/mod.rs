//! Configuration management for artdeck.
//!
//! Configuration is loaded from the platform config directory
//! (`~/.config/artdeck/config.toml` on Linux) with sensible defaults.
//! Every section is optional; missing keys fall back to `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for artdeck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Card harvesting settings
    pub harvest: HarvestConfig,

    /// Captioning settings
    pub caption: CaptionConfig,

    /// Caption model backend settings
    pub model: ModelConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.artdeck.artdeck/config.toml
    /// - Linux: ~/.config/artdeck/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\artdeck\config\config.toml
    ///
    /// Falls back to ~/.artdeck/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "artdeck", "artdeck")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".artdeck").join("config.toml")
            })
    }

    /// Resolved path of the bulk card export (with ~ expansion).
    pub fn cards_path(&self) -> PathBuf {
        expand(&self.harvest.cards_path)
    }

    /// Resolved harvest output directory (with ~ expansion).
    pub fn harvest_output_dir(&self) -> PathBuf {
        expand(&self.harvest.output_dir)
    }

    /// Resolved default captioning input (with ~ expansion).
    pub fn caption_input(&self) -> PathBuf {
        expand(&self.caption.img_dir)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}
