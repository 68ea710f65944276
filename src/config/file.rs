//! Configuration file management for audiodesk.
//!
//! This module handles loading and saving application configuration from TOML files.
//! Configuration is stored in `~/.config/audiodesk/audiodesk.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::waveform::WaveformOptions;

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `audiodesk list-devices`
    /// - device name from `audiodesk list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// Preferred recording sample rate in Hz (the device rate wins if different)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    44100
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
        }
    }
}

/// Generative-AI service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiSettings {
    /// API root, without trailing `/models`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model used for structured audio analysis
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    /// Model used for the mixing advisor
    #[serde(default = "default_advisor_model")]
    pub advisor_model: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_analysis_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_advisor_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            analysis_model: default_analysis_model(),
            advisor_model: default_advisor_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudiodeskConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub waveform: WaveformOptions,
    #[serde(default)]
    pub ai: AiSettings,
}

impl AudiodeskConfig {
    /// Loads configuration from the user's config directory, writing the
    /// defaults first if no file exists yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read or written
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            let config = Self::default();
            config.save_to(&path)?;
            tracing::info!("Default configuration written to {}", path.display());
            return Ok(config);
        }
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file.
    ///
    /// # Errors
    /// - If the file cannot be read
    /// - If the TOML is malformed
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        let config: AudiodeskConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid configuration in {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Saves configuration to a specific file.
    ///
    /// # Errors
    /// - If the parent directory cannot be created
    /// - If the file cannot be written
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::info!("Configuration saved");
        Ok(())
    }
}

/// Path of the config file.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(".config").join("audiodesk").join("audiodesk.toml"))
}
