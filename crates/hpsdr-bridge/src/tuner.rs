//! Output sink tuning.
//!
//! Each start command (re)tunes the IQ output sink to the current TX
//! frequency: an idle sink is initialized, a sink already running on a
//! different frequency is torn down and brought back up, and an
//! out-of-range frequency leaves the sink alone.
//!
//! The tuner owns the sink. It lives inside the consumer task, which is the
//! only place bursts are pushed.

use hpsdr_core::error::Result;
use hpsdr_core::sink::{IqSink, MAX_TX_FREQUENCY_HZ, MIN_TX_FREQUENCY_HZ, tx_frequency_in_range};
use hpsdr_core::types::IqSample;

/// The output sink plus the frequency it was last initialized at.
pub struct SinkTuner {
    sink: Box<dyn IqSink>,
    tuned: Option<u32>,
}

impl SinkTuner {
    pub fn new(sink: Box<dyn IqSink>) -> Self {
        Self { sink, tuned: None }
    }

    /// Frequency of the last successful init.
    pub fn tuned_frequency(&self) -> Option<u32> {
        self.tuned
    }

    pub fn is_ready(&self) -> bool {
        self.sink.is_ready()
    }

    /// Hand one burst to the sink.
    pub async fn push_burst(&mut self, samples: &[IqSample]) -> Result<()> {
        self.sink.push_burst(samples).await
    }

    /// Tune the sink to `frequency_hz`. Returns the new frequency if the sink
    /// was (re)initialized, `None` if nothing changed.
    pub async fn retune(&mut self, frequency_hz: Option<u32>) -> Result<Option<u32>> {
        let Some(frequency) = frequency_hz else {
            tracing::warn!("TX frequency not set yet, output sink left idle");
            return Ok(None);
        };
        if !tx_frequency_in_range(frequency) {
            tracing::warn!(
                frequency,
                min = MIN_TX_FREQUENCY_HZ,
                max = MAX_TX_FREQUENCY_HZ,
                "TX frequency out of range, output sink left untouched"
            );
            return Ok(None);
        }

        if self.sink.is_ready() {
            if self.tuned == Some(frequency) {
                return Ok(None);
            }
            tracing::info!(from = ?self.tuned, to = frequency, "Changing TX frequency");
            self.sink.deinit().await?;
            self.tuned = None;
        }

        self.sink.init(frequency).await?;
        self.tuned = Some(frequency);
        tracing::info!(frequency, "Output sink tuned");
        Ok(Some(frequency))
    }

    /// Deinitialize the sink if it is running.
    pub async fn release(&mut self) -> Result<()> {
        if self.sink.is_ready() {
            self.sink.deinit().await?;
            tracing::info!("Output sink released");
        }
        self.tuned = None;
        Ok(())
    }
}
