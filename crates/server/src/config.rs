//! Server configuration

use anyhow::Result;
use forecast_lib::DEFAULT_BUNDLE_PATH;
use serde::Deserialize;

/// Server configuration, read from `FORECAST_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Path to the artifact bundle
    #[serde(default = "default_bundle_path")]
    pub bundle_path: String,

    /// Expected SHA-256 of the bundle file; unchecked when absent
    #[serde(default)]
    pub bundle_sha256: Option<String>,

    /// Port for the form, JSON API and health/metrics endpoints
    #[serde(default = "default_port")]
    pub port: u16,

    /// Instance name attached to structured log events
    #[serde(default = "default_instance")]
    pub instance: String,
}

fn default_bundle_path() -> String {
    DEFAULT_BUNDLE_PATH.to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "rain-forecast".to_string())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bundle_path: default_bundle_path(),
            bundle_sha256: None,
            port: default_port(),
            instance: default_instance(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix("FORECAST"))
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder().add_source(source).build()?;
        Ok(config.try_deserialize()?)
    }
}
