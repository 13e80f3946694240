use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

pub const DEFAULT_BAUD_RATE: u32 = 19200;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_FRAME_GAP_MS: u64 = 500;
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512;

/// Settings of one sensor connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Bus address of the sensor
    #[serde(default)]
    pub address: u8,
    /// Serial port path, e.g. `/dev/ttyUSB0` or `COM3`
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Delay between two poll commands. `0` means the default.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Line silence that terminates a received frame
    #[serde(default = "default_frame_gap_ms")]
    pub frame_gap_ms: u64,
    /// Received bytes are flushed as a frame once the buffer reaches this size
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_frame_gap_ms() -> u64 {
    DEFAULT_FRAME_GAP_MS
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            address: 0,
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            frame_gap_ms: DEFAULT_FRAME_GAP_MS,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl AdapterConfig {
    /// Parse configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).context("Invalid JSON configuration")
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).context("Invalid TOML configuration")
    }

    /// Read configuration from a `.json` or `.toml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            other => Err(anyhow!(
                "Unsupported config file extension {:?} (expected .json or .toml)",
                other.unwrap_or("")
            )),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        match self.poll_interval_ms {
            0 => Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            ms => Duration::from_millis(ms),
        }
    }

    pub fn frame_gap(&self) -> Duration {
        Duration::from_millis(self.frame_gap_ms)
    }

    /// The configured port, or an error when none is set
    pub fn require_port(&self) -> Result<&str> {
        self.port
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("No serial port configured. Use --port or set `port` in the config file")
            })
    }
}
