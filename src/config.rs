//! Configuration for the window controller.
//!
//! Loads settings from a TOML file at `~/.config/xcbwin/config.toml`.
//! A missing file falls back to defaults; nothing here is fatal.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Platform subdirectory of the asset cache that holds cooked images.
const PLATFORM_ASSET_DIR: &str = "linux";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub splash: SplashConfig,
}

/// Startup splash image settings. Both entries must be present for the
/// splash to be shown; leaving either out disables it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplashConfig {
    /// Image path relative to the platform subdirectory of the asset cache.
    pub image_path: Option<String>,
    /// Root of the prepared asset cache.
    pub cache_root: Option<String>,
}

impl Config {
    /// Load configuration from file, or use defaults if the file is missing.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config = Self::parse(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("xcbwin");

        Ok(config_dir.join("config.toml"))
    }
}

impl SplashConfig {
    /// Full path of the splash image, or `None` when either setting is
    /// absent.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        let image = self.image_path.as_deref()?;
        let cache = self.cache_root.as_deref()?;
        Some(Path::new(cache).join(PLATFORM_ASSET_DIR).join(image))
    }
}
