//! Configuration loading and persistence.
//!
//! The view cache capacity is the runtime layer's only tunable. It is read
//! from a JSON config file in the platform config directory, with
//! environment variable overrides for tests and automation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{fs, path::PathBuf};

use crate::view_cache::DEFAULT_VIEW_CACHE_CAPACITY;

/// Configuration for the termhub runtime layer.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    /// Maximum number of live view surfaces kept by the cache.
    pub view_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            view_cache_capacity: DEFAULT_VIEW_CACHE_CAPACITY,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `TERMHUB_CONFIG_DIR` env var: explicit override (tests, automation)
    /// 2. Default: platform config dir (macOS: ~/Library/Application Support/termhub)
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(dir) = std::env::var("TERMHUB_CONFIG_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("termhub")
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    ///
    /// A missing or unreadable file falls back to defaults; overrides are
    /// applied either way.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_file().unwrap_or_else(|_| Self::default());
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_file() -> Result<Self> {
        let config_path = Self::config_dir()?.join("config.json");
        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            anyhow::bail!("Config file not found")
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(capacity) = std::env::var("TERMHUB_VIEW_CACHE_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(capacity) => self.view_cache_capacity = capacity,
                Err(e) => log::warn!("Ignoring invalid TERMHUB_VIEW_CACHE_CAPACITY: {e}"),
            }
        }
    }

    /// Persists the current configuration to disk.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_dir()?.join("config.json");
        fs::write(&config_path, serde_json::to_string_pretty(self)?)?;

        // Set restrictive permissions (owner read/write only)
        #[cfg(unix)]
        fs::set_permissions(&config_path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }
}
