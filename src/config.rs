//! Configuration management for media access
//!
//! Provides loading, saving and validation of the manager options and the
//! native adapter settings.

use crate::errors::MediaError;
use crate::types::DeviceClass;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaAccessConfig {
    pub manager: ManagerConfig,
    pub native: NativeConfig,
}

/// Options read once when a manager is constructed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Request access as soon as the manager is initialized
    pub auto_request_on_init: bool,
    /// Device class used by the initial request
    pub initial_device_class: DeviceClass,
}

/// Desktop adapter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeConfig {
    /// Camera index passed to the capture backend
    pub camera_index: u32,
    /// Upper bound for opening a single device, in milliseconds
    pub open_timeout_ms: u64,
    /// Audio input device name; the system default when unset
    pub audio_device: Option<String>,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            open_timeout_ms: 10_000,
            audio_device: None,
        }
    }
}

impl MediaAccessConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, MediaError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| MediaError::Config(format!("Failed to read config file: {}", e)))?;

        let config: MediaAccessConfig = toml::from_str(&contents)
            .map_err(|e| MediaError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), MediaError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                MediaError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| MediaError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| MediaError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("media-access.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), MediaError> {
        if self.native.open_timeout_ms == 0 || self.native.open_timeout_ms > 120_000 {
            return Err(MediaError::InvalidConfig(
                "Open timeout must be between 1 and 120000 ms".to_string(),
            ));
        }
        if let Some(name) = &self.native.audio_device {
            if name.trim().is_empty() {
                return Err(MediaError::InvalidConfig(
                    "Audio device name must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
