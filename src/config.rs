//! Configuration management for dualcam
//!
//! Loads and saves the camera, sequencing and storage settings as TOML.

use crate::errors::CameraError;
use crate::types::{CameraRole, DeviceType};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DualCamConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Device discovery and initial session topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Role attached when the session starts
    pub initial_role: CameraRole,
    /// Device classes considered when resolving a role
    pub device_types: Vec<DeviceType>,
}

/// Switch and capture sequencing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Capture a photo after every switch
    pub capture_enabled: bool,
    /// Wait after switching to the front camera, in milliseconds
    pub front_settle_ms: u64,
    /// Wait after switching to the back camera, in milliseconds
    pub back_settle_ms: u64,
    /// Repeat count used when none is given
    pub default_repeat_count: usize,
}

/// Where captured photos are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_directory: PathBuf,
    pub file_prefix: String,
    /// JPEG quality requested from the backend (1-100)
    pub jpeg_quality: u8,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_role: CameraRole::Back,
            device_types: DeviceType::discovery_defaults(),
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            capture_enabled: true,
            // under 30ms the front image can come out green
            front_settle_ms: 30,
            // under 100ms the back image is still dark
            back_settle_ms: 100,
            default_repeat_count: 1,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("./captures"),
            file_prefix: "dualcam".to_string(),
            jpeg_quality: 90,
        }
    }
}

impl SequenceConfig {
    pub fn settle_delays(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.front_settle_ms),
            Duration::from_millis(self.back_settle_ms),
        )
    }
}

impl DualCamConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::Config(format!("Failed to read config file: {}", e)))?;

        let config: DualCamConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate().map_err(CameraError::Config)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CameraError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("dualcam.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.camera.device_types.is_empty() {
            return Err("At least one discovery device type is required".to_string());
        }

        // A settle delay above ten seconds is almost certainly a unit mistake.
        if self.sequence.front_settle_ms > 10_000 || self.sequence.back_settle_ms > 10_000 {
            return Err("Settle delays must be at most 10000ms".to_string());
        }

        if self.storage.file_prefix.is_empty()
            || self
                .storage
                .file_prefix
                .contains(|c: char| c == '/' || c == '\\')
        {
            return Err("File prefix must be non-empty and contain no path separators".to_string());
        }
        if self.storage.jpeg_quality == 0 || self.storage.jpeg_quality > 100 {
            return Err("JPEG quality must be between 1 and 100".to_string());
        }

        Ok(())
    }
}
