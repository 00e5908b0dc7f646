//! hpsdr-core: Core traits, types, configuration and error definitions for
//! the HPSDR Protocol-1 bridge.
//!
//! This crate holds everything the protocol codecs and the network session
//! share without depending on each other.
//!
//! # Key types
//!
//! - [`DeviceProfile`] -- the emulated hardware personality
//! - [`Register`] -- identity of one EP2 control register
//! - [`IqSink`] -- the hardware IQ output path
//! - [`FrameOutput`] -- where generated EP6 frames are sent
//! - [`BridgeEvent`] -- asynchronous state change notifications
//! - [`BridgeConfig`] -- YAML service configuration
//! - [`Error`] / [`Result`] -- error handling

pub mod config;
pub mod error;
pub mod events;
pub mod filters;
pub mod maintenance;
pub mod register;
pub mod sink;
pub mod transport;
pub mod types;

pub use config::{BridgeConfig, FilterConfig, GlobalConfig, NetworkConfig, SinkConfig, SinkKind};
pub use error::{Error, Result};
pub use events::BridgeEvent;
pub use filters::{BandFilter, FilterSwitch, LogFilterSwitch, select_band};
pub use maintenance::{IgnoreMaintenance, MaintenanceHandler, MaintenanceKind};
pub use register::{REGISTER_COUNT, Register};
pub use sink::{IqSink, tx_frequency_in_range};
pub use transport::FrameOutput;
pub use types::{DeviceProfile, IqSample, MacAddress, ProfileInfo};
