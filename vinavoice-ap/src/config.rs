//! Player configuration
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--device, --null-output, --sample-rate, ...)
//! 2. TOML configuration file (--config, VINAVOICE_CONFIG, platform config dir)
//! 3. Built-in defaults (code constants)
//!
//! The file is read once at startup.

use crate::audio::types::{SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};
use crate::error::{Error, Result};
use crate::playback::scheduler::DEFAULT_FRAME_RATE_HZ;
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use vinavoice_common::config::{load_toml, resolve_config_path, CONFIG_ENV_VAR};

/// Highest accepted progress refresh rate
pub const MAX_FRAME_RATE_HZ: u32 = 240;

/// Where audio goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// System audio device via cpal
    #[default]
    Device,
    /// Headless virtual context (no sound, real-time clock)
    Null,
}

/// Player configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Sample rate of synthesized payloads (Hz)
    pub sample_rate: u32,

    /// Channel count of synthesized payloads (only mono is supported)
    pub channels: u16,

    /// Progress polls per second while playing
    pub frame_rate_hz: u32,

    pub output: OutputKind,

    /// Output device name (optional, default device if absent or not found)
    pub device_name: Option<String>,

    /// Start playing as soon as a payload is loaded
    pub autoplay: bool,

    pub logging: LoggingConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: SPEECH_SAMPLE_RATE,
            channels: SPEECH_CHANNELS,
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            output: OutputKind::Device,
            device_name: None,
            autoplay: false,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub device_name: Option<String>,
    pub null_output: bool,
    pub sample_rate: Option<u32>,
    pub frame_rate_hz: Option<u32>,
    pub autoplay: bool,
}

impl PlayerConfig {
    /// Resolve, load and validate the configuration.
    ///
    /// `config_path` is the `--config` argument; without it the
    /// `VINAVOICE_CONFIG` variable and the platform config directory are
    /// tried before falling back to defaults.
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match resolve_config_path(config_path, CONFIG_ENV_VAR)? {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                load_toml::<PlayerConfig>(&path)?
            }
            None => PlayerConfig::default(),
        };

        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(name) = overrides.device_name {
            self.device_name = Some(name);
        }
        if overrides.null_output {
            self.output = OutputKind::Null;
        }
        if let Some(rate) = overrides.sample_rate {
            self.sample_rate = rate;
        }
        if let Some(rate) = overrides.frame_rate_hz {
            self.frame_rate_hz = rate;
        }
        if overrides.autoplay {
            self.autoplay = true;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }

        if self.channels != 1 {
            return Err(Error::Config(format!(
                "channels must be 1 (mono), got {}",
                self.channels
            )));
        }

        if !(1..=MAX_FRAME_RATE_HZ).contains(&self.frame_rate_hz) {
            return Err(Error::Config(format!(
                "frame_rate_hz must be between 1 and {}, got {}",
                MAX_FRAME_RATE_HZ, self.frame_rate_hz
            )));
        }

        Ok(())
    }
}
