//! Hardware IQ output sink.
//!
//! The [`IqSink`] trait is the boundary between the bridge and whatever
//! actually radiates the transmit IQ stream (a DMA-driven modulator, a
//! file, a null device). The bridge tunes it when streaming starts and a
//! consumer task feeds it one burst at a time.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::IqSample;

/// Lowest TX frequency the output path can be tuned to, in hertz.
pub const MIN_TX_FREQUENCY_HZ: u32 = 1_000_000;
/// Highest TX frequency the output path can be tuned to, in hertz.
pub const MAX_TX_FREQUENCY_HZ: u32 = 500_000_000;

/// Asynchronous consumer of transmit IQ bursts.
#[async_trait]
pub trait IqSink: Send {
    /// Prepare the output path at the given carrier frequency.
    async fn init(&mut self, frequency_hz: u32) -> Result<()>;

    /// Release the output path. Calling this on an uninitialized sink is a
    /// no-op.
    async fn deinit(&mut self) -> Result<()>;

    /// Transmit one burst of samples. The burst length equals the configured
    /// burst size.
    async fn push_burst(&mut self, samples: &[IqSample]) -> Result<()>;

    /// Whether [`init`](IqSink::init) has succeeded and the sink accepts bursts.
    fn is_ready(&self) -> bool;
}

/// Whether a TX frequency is inside the range the output path supports.
pub fn tx_frequency_in_range(frequency_hz: u32) -> bool {
    (MIN_TX_FREQUENCY_HZ..=MAX_TX_FREQUENCY_HZ).contains(&frequency_hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_range_bounds() {
        assert!(!tx_frequency_in_range(999_999));
        assert!(tx_frequency_in_range(1_000_000));
        assert!(tx_frequency_in_range(14_074_000));
        assert!(tx_frequency_in_range(500_000_000));
        assert!(!tx_frequency_in_range(500_000_001));
        assert!(!tx_frequency_in_range(0));
    }
}
