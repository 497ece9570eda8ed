//! Coordinator configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration file shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coordinator settings
    pub coordinator: CoordinatorConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path)
                .context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .evacsim.yml
        let local_config = PathBuf::from(".evacsim.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/evacsim/evacsim.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("evacsim").join("evacsim.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Coordinator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Seconds between route regeneration ticks
    #[serde(rename = "regen-interval-secs")]
    pub regen_interval_secs: u64,

    /// Backend host to fetch shelter data from
    #[serde(rename = "backend-host")]
    pub backend_host: String,

    /// Backend port
    #[serde(rename = "backend-port")]
    pub backend_port: u16,

    /// Per-session channel capacity
    #[serde(rename = "channel-buffer")]
    pub channel_buffer: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            regen_interval_secs: 10,
            backend_host: "127.0.0.1".to_string(),
            backend_port: 3000,
            channel_buffer: 64,
        }
    }
}

impl CoordinatorConfig {
    pub fn regen_interval(&self) -> Duration {
        Duration::from_secs(self.regen_interval_secs)
    }

    pub fn backend_addr(&self) -> String {
        format!("{}:{}", self.backend_host, self.backend_port)
    }
}
