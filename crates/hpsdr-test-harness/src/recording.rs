//! Frame output that records instead of sending.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use hpsdr_core::error::{Error, Result};
use hpsdr_core::transport::FrameOutput;

/// A frame captured by [`RecordingOutput`], stamped with the (possibly
/// paused) tokio clock.
#[derive(Debug, Clone)]
pub struct RecordedFrame {
    pub at: Instant,
    pub data: Vec<u8>,
}

impl RecordedFrame {
    /// Big-endian sequence number at bytes 4..8.
    pub fn sequence(&self) -> u32 {
        u32::from_be_bytes([self.data[4], self.data[5], self.data[6], self.data[7]])
    }
}

/// A [`FrameOutput`] that keeps every frame it is given.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    frames: Arc<Mutex<Vec<RecordedFrame>>>,
    disconnected: Arc<AtomicBool>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with `NotConnected`.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::Release);
    }

    pub async fn frames(&self) -> Vec<RecordedFrame> {
        self.frames.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.frames.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.frames.lock().await.is_empty()
    }

    pub async fn clear(&self) {
        self.frames.lock().await.clear();
    }

    /// Wait until at least `count` frames were recorded. Returns `false` on
    /// timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.len().await >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[async_trait]
impl FrameOutput for RecordingOutput {
    async fn send_frame(&self, frame: &[u8]) -> Result<()> {
        if self.disconnected.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }
        self.frames.lock().await.push(RecordedFrame {
            at: Instant::now(),
            data: frame.to_vec(),
        });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.disconnected.load(Ordering::Acquire)
    }
}
