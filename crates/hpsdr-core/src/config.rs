//! YAML configuration for the bridge service.
//!
//! Every field has a default, so an empty document (or a missing file) gives
//! a working Hermes emulation on UDP port 1024.
//!
//! ```yaml
//! global:
//!   debug: false
//!   iqburst: 4000
//!   emulation: hermes
//!   ring_bursts: 10
//!   mac: "aa:bb:cc:dd:ee:ff"
//! network:
//!   bind: "0.0.0.0"
//!   port: 1024
//! sink:
//!   kind: discard
//!   sample_rate: 48000
//! filters:
//!   enabled: true
//!   type: gpio
//!   gpios: [17, 27, 22, 23]
//!   bands:
//!     - { name: "40m", start_hz: 7000000, end_hz: 7300000, lpf: 2, hpf: 1 }
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filters::BandFilter;
use crate::types::{DeviceProfile, MacAddress};

/// Default HPSDR Protocol-1 port for both UDP and the TCP fallback.
pub const DEFAULT_PORT: u16 = 1024;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub global: GlobalConfig,
    pub network: NetworkConfig,
    pub sink: SinkConfig,
    pub filters: FilterConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Raise the default log level to debug.
    pub debug: bool,
    /// Samples per burst handed to the output sink.
    pub iqburst: usize,
    /// Device personality presented to clients.
    pub emulation: DeviceProfile,
    /// Number of bursts held by the IQ ring buffer.
    pub ring_bursts: usize,
    /// Hardware address reported in discovery replies.
    pub mac: MacAddress,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug: false,
            iqburst: 4000,
            emulation: DeviceProfile::Hermes,
            ring_bursts: 10,
            mac: MacAddress::default(),
        }
    }
}

/// Socket settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Receive timeout of one poll, in milliseconds.
    pub poll_timeout_ms: u64,
    /// How long a stop command waits for the frame generator to exit.
    pub stop_timeout_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            poll_timeout_ms: 1,
            stop_timeout_ms: 500,
        }
    }
}

impl NetworkConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Which bundled output sink the service drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Discard bursts at the configured sample rate.
    #[default]
    Discard,
    /// Append interleaved little-endian f32 I/Q to a file.
    File,
}

/// Output sink settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// Output file for [`SinkKind::File`].
    pub path: PathBuf,
    /// TX sample rate in samples per second.
    pub sample_rate: u32,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Discard,
            path: PathBuf::from("tx.cf32"),
            sample_rate: 48_000,
        }
    }
}

/// Band-dependent filter switching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    /// Switching back end, e.g. `gpio`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Output pins driven by the filter bit patterns.
    pub gpios: Vec<u32>,
    pub bands: Vec<BandFilter>,
}

impl BridgeConfig {
    /// Load configuration from a YAML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: BridgeConfig =
            serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check the values serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.global.iqburst == 0 {
            return Err(Error::Config("global.iqburst must be > 0".into()));
        }
        if self.global.ring_bursts < 2 {
            return Err(Error::Config("global.ring_bursts must be >= 2".into()));
        }
        if self.network.poll_timeout_ms == 0 {
            return Err(Error::Config("network.poll_timeout_ms must be > 0".into()));
        }
        if self.sink.sample_rate == 0 {
            return Err(Error::Config("sink.sample_rate must be > 0".into()));
        }
        for band in &self.filters.bands {
            if band.start_hz > band.end_hz {
                return Err(Error::Config(format!(
                    "band '{}' starts above its end",
                    band.name
                )));
            }
        }
        Ok(())
    }
}
