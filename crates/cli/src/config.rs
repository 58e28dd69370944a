//! Configuration management for the CLI

use anyhow::{Context, Result};
use forecast_lib::DEFAULT_BUNDLE_PATH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Local artifact bundle
    pub bundle_path: Option<String>,
    /// Forecast server endpoint
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration from the default location; absent file means defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("rainfc").join("config.json"))
    }

    /// Flag (or env) value first, then the config file, then the built-in default
    pub fn bundle_path(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.bundle_path.clone())
            .unwrap_or_else(|| DEFAULT_BUNDLE_PATH.to_string())
    }

    pub fn api_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }
}
