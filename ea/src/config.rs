//! Agent configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration file shape. Shares the same file as the
/// Coordinator; only the `agent` section is read here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent settings
    pub agent: AgentConfig,
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

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Seconds between traversal steps
    #[serde(rename = "step-interval-secs")]
    pub step_interval_secs: u64,

    /// Seconds between link-quality samples
    #[serde(rename = "signal-interval-secs")]
    pub signal_interval_secs: u64,

    /// Probability a sample reports a degraded link
    #[serde(rename = "bad-signal-ratio")]
    pub bad_signal_ratio: f64,

    /// Starting latitude before jitter
    #[serde(rename = "origin-lat")]
    pub origin_lat: f64,

    /// Starting longitude before jitter
    #[serde(rename = "origin-lng")]
    pub origin_lng: f64,

    /// Uniform jitter applied to each starting axis, in degrees
    #[serde(rename = "jitter-deg")]
    pub jitter_deg: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            step_interval_secs: 5,
            signal_interval_secs: 7,
            bad_signal_ratio: 0.2,
            origin_lat: 35.68,
            origin_lng: 139.767,
            jitter_deg: 0.005,
        }
    }
}

impl AgentConfig {
    pub fn step_interval(&self) -> Duration {
        Duration::from_secs(self.step_interval_secs)
    }

    pub fn signal_interval(&self) -> Duration {
        Duration::from_secs(self.signal_interval_secs)
    }
}
