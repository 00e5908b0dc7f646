//! Recording IQ sink for testing the bridge without an output device.
//!
//! [`MockSink`] implements [`IqSink`] and records every call into a log
//! shared with a [`SinkProbe`], so a test can hand the sink to the bridge
//! and still inspect what happened to it.
//!
//! # Example
//!
//! ```
//! use hpsdr_test_harness::MockSink;
//!
//! let (sink, probe) = MockSink::new();
//! let sink = sink.with_burst_delay(std::time::Duration::from_millis(5));
//! # drop((sink, probe));
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use hpsdr_core::error::{Error, Result};
use hpsdr_core::sink::IqSink;
use hpsdr_core::types::IqSample;

/// One call made on a [`MockSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Init(u32),
    Deinit,
}

#[derive(Debug, Default)]
struct SinkLog {
    calls: Vec<SinkCall>,
    bursts: Vec<Vec<IqSample>>,
}

/// A mock [`IqSink`].
///
/// `push_burst` sleeps for the configured burst delay (1 ms by default) to
/// stand in for a device that blocks while the burst is transmitted.
#[derive(Debug)]
pub struct MockSink {
    log: Arc<Mutex<SinkLog>>,
    ready: bool,
    fail_init: bool,
    burst_delay: Duration,
}

/// Read access to a [`MockSink`]'s log after the sink has been handed off.
#[derive(Debug, Clone)]
pub struct SinkProbe {
    log: Arc<Mutex<SinkLog>>,
}

impl MockSink {
    /// Create an uninitialized sink and its probe.
    pub fn new() -> (Self, SinkProbe) {
        let log = Arc::new(Mutex::new(SinkLog::default()));
        let sink = MockSink {
            log: log.clone(),
            ready: false,
            fail_init: false,
            burst_delay: Duration::from_millis(1),
        };
        (sink, SinkProbe { log })
    }

    /// Make every `init` call fail.
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn with_burst_delay(mut self, delay: Duration) -> Self {
        self.burst_delay = delay;
        self
    }
}

#[async_trait]
impl IqSink for MockSink {
    async fn init(&mut self, frequency_hz: u32) -> Result<()> {
        if self.fail_init {
            return Err(Error::Transport("mock sink refused init".into()));
        }
        self.log.lock().await.calls.push(SinkCall::Init(frequency_hz));
        self.ready = true;
        Ok(())
    }

    async fn deinit(&mut self) -> Result<()> {
        if self.ready {
            self.log.lock().await.calls.push(SinkCall::Deinit);
            self.ready = false;
        }
        Ok(())
    }

    async fn push_burst(&mut self, samples: &[IqSample]) -> Result<()> {
        if !self.ready {
            return Err(Error::SinkNotReady);
        }
        self.log.lock().await.bursts.push(samples.to_vec());
        tokio::time::sleep(self.burst_delay).await;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

impl SinkProbe {
    /// Init/deinit calls in order.
    pub async fn calls(&self) -> Vec<SinkCall> {
        self.log.lock().await.calls.clone()
    }

    /// Number of bursts pushed so far.
    pub async fn burst_count(&self) -> usize {
        self.log.lock().await.bursts.len()
    }

    /// All bursts pushed so far.
    pub async fn bursts(&self) -> Vec<Vec<IqSample>> {
        self.log.lock().await.bursts.clone()
    }

    /// Whether any pushed burst contains a non-silent sample.
    pub async fn saw_signal(&self) -> bool {
        self.log
            .lock()
            .await
            .bursts
            .iter()
            .flatten()
            .any(|s| *s != IqSample::SILENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_lifecycle() {
        let (mut sink, probe) = MockSink::new();
        assert!(!sink.is_ready());
        sink.deinit().await.unwrap();
        sink.init(7_000_000).await.unwrap();
        assert!(sink.is_ready());
        sink.deinit().await.unwrap();
        assert_eq!(
            probe.calls().await,
            vec![SinkCall::Init(7_000_000), SinkCall::Deinit]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn push_requires_init() {
        let (mut sink, probe) = MockSink::new();
        assert!(matches!(
            sink.push_burst(&[IqSample::SILENCE]).await,
            Err(Error::SinkNotReady)
        ));
        sink.init(7_000_000).await.unwrap();
        sink.push_burst(&[IqSample::new(0.5, 0.0)]).await.unwrap();
        assert_eq!(probe.burst_count().await, 1);
        assert!(probe.saw_signal().await);
    }

    #[tokio::test]
    async fn failing_init() {
        let (sink, _probe) = MockSink::new();
        let mut sink = sink.failing_init();
        assert!(sink.init(7_000_000).await.is_err());
        assert!(!sink.is_ready());
    }
}
