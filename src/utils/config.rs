//! Configuration management for pp
//!
//! This module handles loading and managing application configuration
//! from the user config file and environment variables. Command line
//! flags are applied on top by `main`.

use crate::player::MIN_SPEED_DELTA;
use crate::utils::error::{PlayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transport configuration
    pub playback: PlaybackConfig,

    /// Audio sidecar configuration
    pub audio: AudioConfig,

    /// Status overlay configuration
    pub overlay: OverlayConfig,

    /// Window configuration
    pub window: WindowConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Short seek step in seconds (Left/Right)
    pub seek_short: u64,

    /// Long seek step in seconds (Up/Down)
    pub seek_long: u64,

    /// Speed change per key press
    pub speed_step: f64,

    /// Lowest allowed playback speed
    pub min_speed: f64,

    /// Highest allowed playback speed
    pub max_speed: f64,

    /// Initial playback speed
    pub initial_speed: f64,
}

/// Audio sidecar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Play audio through the external player
    pub enabled: bool,

    /// Program used for audio playback
    pub command: String,

    /// Drift beyond which the audio process is restarted
    pub resync_threshold_ms: u64,

    /// How often drift is measured while playing
    pub resync_interval_ms: u64,
}

/// Status overlay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Total time a status message stays on screen
    pub duration_ms: u64,

    /// Trailing part of `duration_ms` spent fading out
    pub fade_ms: u64,

    /// Font size in pixels
    pub font_size: f32,

    /// Font tried before the system fallbacks
    pub font_path: Option<PathBuf>,
}

/// Window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Initial window width
    pub width: u32,

    /// Initial window height
    pub height: u32,

    /// Title shown before the first video loads
    pub title: String,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Write logs to this file instead of stderr
    pub log_file: Option<PathBuf>,

    /// Resume positions file; defaults to ~/.pp_timestamps.json
    pub resume_file: Option<PathBuf>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            seek_short: 10,
            seek_long: 60,
            speed_step: 0.1,
            min_speed: 0.1,
            max_speed: 3.0,
            initial_speed: 1.0,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "ffplay".to_string(),
            resync_threshold_ms: 300,
            resync_interval_ms: 5000,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2000,
            fade_ms: 500,
            font_size: 24.0,
            font_path: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Video Player".to_string(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            resume_file: None,
        }
    }
}

impl AudioConfig {
    pub fn resync_threshold(&self) -> Duration {
        Duration::from_millis(self.resync_threshold_ms)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_millis(self.resync_interval_ms)
    }
}

impl OverlayConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}

impl GeneralConfig {
    /// Resolved location of the resume positions file
    pub fn resume_path(&self) -> PathBuf {
        self.resume_file.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".pp_timestamps.json")
        })
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. Explicit config file if given, otherwise the user config file
    ///    (~/.config/pp/config.toml on Linux)
    /// 3. Environment variables (PP_* prefix)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::user_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PlayerError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&contents)
            .map_err(|e| PlayerError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to user config file
    pub fn save(&self) -> Result<()> {
        let path = Self::user_config_path()
            .ok_or_else(|| PlayerError::Config("Cannot determine user config path".to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PlayerError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let toml = toml::to_string_pretty(self)
            .map_err(|e| PlayerError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, toml)
            .map_err(|e| PlayerError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var("PP_SEEK_SHORT") {
            self.playback.seek_short = value.parse()
                .map_err(|_| PlayerError::Config("Invalid PP_SEEK_SHORT".to_string()))?;
        }

        if let Ok(value) = std::env::var("PP_SEEK_LONG") {
            self.playback.seek_long = value.parse()
                .map_err(|_| PlayerError::Config("Invalid PP_SEEK_LONG".to_string()))?;
        }

        if let Ok(value) = std::env::var("PP_AUDIO_COMMAND") {
            self.audio.command = value;
        }

        if let Ok(value) = std::env::var("PP_RESUME_FILE") {
            self.general.resume_file = Some(PathBuf::from(value));
        }

        if let Ok(log_level) = std::env::var("PP_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.playback.seek_short == 0 || self.playback.seek_long == 0 {
            return Err(PlayerError::Config("Seek steps must be non-zero".to_string()));
        }

        let playback = &self.playback;
        if playback.min_speed <= 0.0 || playback.min_speed >= playback.max_speed {
            return Err(PlayerError::Config(format!(
                "Speed range {}..{} is invalid",
                playback.min_speed, playback.max_speed
            )));
        }

        if playback.speed_step.is_nan() || playback.speed_step < MIN_SPEED_DELTA {
            return Err(PlayerError::Config(format!(
                "Speed step {} must be at least {}",
                playback.speed_step, MIN_SPEED_DELTA
            )));
        }

        if !(playback.min_speed..=playback.max_speed).contains(&playback.initial_speed) {
            return Err(PlayerError::Config(format!(
                "Initial speed {} is outside {}..{}",
                playback.initial_speed, playback.min_speed, playback.max_speed
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(PlayerError::Config("Window dimensions must be non-zero".to_string()));
        }

        if self.overlay.fade_ms > self.overlay.duration_ms {
            return Err(PlayerError::Config("Overlay fade cannot exceed its duration".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(PlayerError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level,
                valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pp").join("config.toml"))
    }
}
