//! Band plan lookup for external filter switching.
//!
//! A transmitter needs a different low-pass (and optionally high-pass)
//! filter per band. The configuration lists bands with the bit patterns to
//! apply; when the TX frequency changes the bridge looks up the band and
//! hands the selection to a [`FilterSwitch`].

use serde::{Deserialize, Serialize};

/// One entry of the band plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandFilter {
    pub name: String,
    /// Lowest frequency of the band, inclusive, in hertz.
    pub start_hz: u32,
    /// Highest frequency of the band, inclusive, in hertz.
    pub end_hz: u32,
    /// Low-pass filter bit pattern.
    pub lpf: u32,
    /// High-pass filter bit pattern.
    pub hpf: u32,
}

impl BandFilter {
    pub fn contains(&self, frequency_hz: u32) -> bool {
        (self.start_hz..=self.end_hz).contains(&frequency_hz)
    }
}

/// Find the first band containing `frequency_hz`.
pub fn select_band(bands: &[BandFilter], frequency_hz: u32) -> Option<&BandFilter> {
    bands.iter().find(|b| b.contains(frequency_hz))
}

/// Something that can physically switch filters.
pub trait FilterSwitch: Send + Sync {
    fn apply(&self, band: &BandFilter);
}

/// Filter switch that only logs the selection.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFilterSwitch;

impl FilterSwitch for LogFilterSwitch {
    fn apply(&self, band: &BandFilter) {
        tracing::info!(band = %band.name, lpf = band.lpf, hpf = band.hpf, "Filter selected");
    }
}
