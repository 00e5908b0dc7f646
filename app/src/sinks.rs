//! Bundled IQ output sinks.
//!
//! Neither sink drives real hardware. [`NullSink`] discards bursts and
//! [`FileSink`] appends them to a file as interleaved little-endian `f32`
//! I/Q. Both block in `push_burst` for the time the burst spans at the
//! configured sample rate, like a device draining its DMA buffer.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::Instant;

use hpsdr_core::error::{Error, Result};
use hpsdr_core::sink::IqSink;
use hpsdr_core::types::IqSample;

/// Paces bursts back to back at a fixed sample rate.
#[derive(Debug)]
struct BurstClock {
    sample_rate: u32,
    next: Option<Instant>,
}

impl BurstClock {
    fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            next: None,
        }
    }

    fn span(&self, samples: usize) -> Duration {
        Duration::from_secs_f64(samples as f64 / f64::from(self.sample_rate))
    }

    /// Wait until a burst of `samples` has been "transmitted". A caller that
    /// fell behind restarts the schedule from now.
    async fn wait(&mut self, samples: usize) {
        let now = Instant::now();
        let start = self.next.filter(|t| *t > now).unwrap_or(now);
        let end = start + self.span(samples);
        tokio::time::sleep_until(end).await;
        self.next = Some(end);
    }

    fn reset(&mut self) {
        self.next = None;
    }
}

// ---------------------------------------------------------------------------
// NullSink
// ---------------------------------------------------------------------------

/// Discards every burst.
#[derive(Debug)]
pub struct NullSink {
    clock: BurstClock,
    frequency: Option<u32>,
}

impl NullSink {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            clock: BurstClock::new(sample_rate),
            frequency: None,
        }
    }
}

#[async_trait]
impl IqSink for NullSink {
    async fn init(&mut self, frequency_hz: u32) -> Result<()> {
        tracing::info!(frequency = frequency_hz, "Null sink enabled");
        self.frequency = Some(frequency_hz);
        self.clock.reset();
        Ok(())
    }

    async fn deinit(&mut self) -> Result<()> {
        if self.frequency.take().is_some() {
            tracing::info!("Null sink disabled");
        }
        Ok(())
    }

    async fn push_burst(&mut self, samples: &[IqSample]) -> Result<()> {
        if self.frequency.is_none() {
            return Err(Error::SinkNotReady);
        }
        self.clock.wait(samples.len()).await;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.frequency.is_some()
    }
}

// ---------------------------------------------------------------------------
// FileSink
// ---------------------------------------------------------------------------

/// Appends bursts to a file as `f32` little-endian I then Q.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    clock: BurstClock,
    writer: Option<BufWriter<File>>,
    scratch: Vec<u8>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            path: path.into(),
            clock: BurstClock::new(sample_rate),
            writer: None,
            scratch: Vec::new(),
        }
    }
}

#[async_trait]
impl IqSink for FileSink {
    async fn init(&mut self, frequency_hz: u32) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::Transport(format!("{}: {e}", self.path.display())))?;
        tracing::info!(
            path = %self.path.display(),
            frequency = frequency_hz,
            "File sink opened"
        );
        self.writer = Some(BufWriter::new(file));
        self.clock.reset();
        Ok(())
    }

    async fn deinit(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().await?;
            tracing::info!(path = %self.path.display(), "File sink closed");
        }
        Ok(())
    }

    async fn push_burst(&mut self, samples: &[IqSample]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(Error::SinkNotReady)?;
        self.scratch.clear();
        for sample in samples {
            self.scratch.extend_from_slice(&sample.i.to_le_bytes());
            self.scratch.extend_from_slice(&sample.q.to_le_bytes());
        }
        writer.write_all(&self.scratch).await?;
        self.clock.wait(samples.len()).await;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.writer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn null_sink_paces_at_sample_rate() {
        let mut sink = NullSink::new(48_000);
        assert!(!sink.is_ready());
        sink.init(7_074_000).await.unwrap();

        let burst = vec![IqSample::SILENCE; 4800];
        let start = Instant::now();
        for _ in 0..3 {
            sink.push_burst(&burst).await.unwrap();
        }
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(310), "{elapsed:?}");
    }

    #[tokio::test]
    async fn null_sink_rejects_bursts_when_idle() {
        let mut sink = NullSink::new(48_000);
        assert!(matches!(
            sink.push_burst(&[IqSample::SILENCE]).await,
            Err(Error::SinkNotReady)
        ));
        sink.init(7_074_000).await.unwrap();
        sink.deinit().await.unwrap();
        assert!(!sink.is_ready());
    }

    #[tokio::test]
    async fn file_sink_writes_interleaved_le_floats() {
        let path = std::env::temp_dir().join(format!("hpsdr-file-sink-{}.cf32", std::process::id()));
        let _ = std::fs::remove_file(&path);

        let mut sink = FileSink::new(&path, 1_000_000);
        sink.init(14_074_000).await.unwrap();
        sink.push_burst(&[IqSample::new(0.5, -0.25), IqSample::new(1.0, 0.0)])
            .await
            .unwrap();
        sink.deinit().await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let floats: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_eq!(floats, vec![0.5, -0.25, 1.0, 0.0]);
        let _ = std::fs::remove_file(&path);
    }
}
