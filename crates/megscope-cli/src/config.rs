//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use megscope_core::{ConnectRequest, DisplaySettings, HealthOptions, SchedulerOptions};
use megscope_types::DEFAULT_CHANNEL_COUNT;
use serde::{Deserialize, Serialize};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Acquisition service base URL
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Channels to configure before the first batch arrives
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,

    /// Status probe interval (2000-5000)
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,

    /// Sample poll interval while the connection is viable
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Age after which buffered data is refetched
    #[serde(default = "default_staleness_ms")]
    pub staleness_ms: u64,

    /// `max_samples` query parameter for the monitor endpoint
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,

    /// Sensor panel poll interval
    #[serde(default = "default_sensor_interval_ms")]
    pub sensor_interval_ms: u64,

    /// Waveform frames per second
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Initial waveform window in seconds
    #[serde(default = "default_time_window_secs")]
    pub time_window_secs: f64,

    /// Initial full-scale amplitude
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,

    /// Where exports are written (defaults to the documents directory)
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    /// Parameters for the connect command
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Device connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_device_host")]
    pub host: String,

    #[serde(default = "default_device_port")]
    pub port: u16,

    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: u32,

    #[serde(default = "default_device_channels")]
    pub channels: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_service_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_channel_count() -> usize {
    DEFAULT_CHANNEL_COUNT
}

fn default_health_interval_ms() -> u64 {
    2000
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_staleness_ms() -> u64 {
    50
}

fn default_max_samples() -> usize {
    100
}

fn default_sensor_interval_ms() -> u64 {
    1000
}

fn default_frame_rate() -> u32 {
    60
}

fn default_time_window_secs() -> f64 {
    5.0
}

fn default_amplitude() -> f64 {
    1.0
}

fn default_device_host() -> String {
    ConnectRequest::default().host
}

fn default_device_port() -> u16 {
    ConnectRequest::default().port
}

fn default_sampling_rate() -> u32 {
    ConnectRequest::default().sampling_rate
}

fn default_device_channels() -> u32 {
    ConnectRequest::default().channels
}

fn default_timeout_ms() -> u64 {
    ConnectRequest::default().timeout
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            channel_count: default_channel_count(),
            health_interval_ms: default_health_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            staleness_ms: default_staleness_ms(),
            max_samples: default_max_samples(),
            sensor_interval_ms: default_sensor_interval_ms(),
            frame_rate: default_frame_rate(),
            time_window_secs: default_time_window_secs(),
            amplitude: default_amplitude(),
            export_dir: None,
            device: DeviceConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: default_device_host(),
            port: default_device_port(),
            sampling_rate: default_sampling_rate(),
            channels: default_device_channels(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("megscope")
            .join("config.toml")
    }

    /// Load config from the default path, or return defaults if missing or broken
    pub fn load() -> Self {
        let path = Self::path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {e:#}");
                Self::default()
            }
        }
    }

    /// Load config from `path`
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Apply command-line overrides on top of the file values
    pub fn apply_overrides(&mut self, url: Option<String>, channels: Option<usize>) {
        if let Some(url) = url {
            self.service_url = url;
        }
        if let Some(channels) = channels {
            self.channel_count = channels;
        }
    }

    pub fn health_options(&self) -> HealthOptions {
        HealthOptions::with_interval(Duration::from_millis(self.health_interval_ms))
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions::builder()
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
            .staleness(Duration::from_millis(self.staleness_ms))
            .build()
    }

    pub fn sensor_interval(&self) -> Duration {
        Duration::from_millis(self.sensor_interval_ms)
    }

    /// Time between painted frames. A zero frame rate falls back to 60 fps.
    pub fn frame_interval(&self) -> Duration {
        let fps = if self.frame_rate == 0 {
            default_frame_rate()
        } else {
            self.frame_rate
        };
        Duration::from_secs_f64(1.0 / f64::from(fps))
    }

    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings::new(self.time_window_secs, self.amplitude)
    }

    pub fn connect_request(&self) -> ConnectRequest {
        ConnectRequest {
            host: self.device.host.clone(),
            port: self.device.port,
            sampling_rate: self.device.sampling_rate,
            channels: self.device.channels,
            timeout: self.device.timeout_ms,
        }
    }

    /// Resolved export directory
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| {
            dirs::document_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("megscope")
        })
    }
}
