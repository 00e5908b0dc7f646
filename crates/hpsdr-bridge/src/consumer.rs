//! IQ consumer task: owns the output sink and drains the ring buffer into it.
//!
//! The consumer runs for the lifetime of the session. While the sink is not
//! initialized it backs off; once it is, it hands the sink one burst after
//! another, oldest first. The sink paces the loop: `push_burst` returns
//! when the device is ready for the next burst.
//!
//! The session never touches the sink itself. Retune requests arrive over a
//! channel and are applied between bursts, so a slow sink delays the retune
//! but never the poll loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use hpsdr_core::error::{Error, Result};
use hpsdr_core::events::BridgeEvent;
use hpsdr_core::types::IqSample;
use hpsdr_protocol::IqRingBuffer;

use crate::tuner::SinkTuner;

/// Back-off while the sink is not ready or after a failed push.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(1);

const RETUNE_QUEUE: usize = 32;

/// Counters returned when the consumer exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub bursts_pushed: u64,
    pub push_errors: u64,
}

/// Handle to the consumer task. Dropping it ends the task after the
/// current burst.
#[derive(Debug)]
pub struct ConsumerHandle {
    cancel: CancellationToken,
    retune_tx: mpsc::Sender<Option<u32>>,
    task: JoinHandle<ConsumerStats>,
}

impl ConsumerHandle {
    /// Queue a retune to `frequency_hz`. Returns at once; the consumer
    /// applies it before its next burst and emits
    /// [`BridgeEvent::SinkTuned`] if the sink was (re)initialized.
    pub fn retune(&self, frequency_hz: Option<u32>) {
        if let Err(e) = self.retune_tx.try_send(frequency_hz) {
            warn!(error = %e, "Output sink retune request dropped");
        }
    }

    /// Stop the consumer and wait up to `timeout` for it to release the sink
    /// and exit. On expiry the task is aborted and [`Error::Timeout`]
    /// returned.
    pub async fn shutdown(mut self, timeout: Duration) -> Result<ConsumerStats> {
        self.cancel.cancel();
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(stats)) => Ok(stats),
            Ok(Err(e)) => Err(Error::Transport(format!("IQ consumer task failed: {e}"))),
            Err(_) => {
                self.task.abort();
                Err(Error::Timeout)
            }
        }
    }
}

/// Spawn the consumer. It takes ownership of the sink through `tuner`.
pub fn spawn_consumer(
    ring: Arc<Mutex<IqRingBuffer>>,
    tuner: SinkTuner,
    events: broadcast::Sender<BridgeEvent>,
    backoff: Duration,
) -> ConsumerHandle {
    let cancel = CancellationToken::new();
    let (retune_tx, retune_rx) = mpsc::channel(RETUNE_QUEUE);
    let task = tokio::spawn(consumer_loop(
        ring,
        tuner,
        retune_rx,
        events,
        backoff,
        cancel.clone(),
    ));
    ConsumerHandle {
        cancel,
        retune_tx,
        task,
    }
}

async fn apply_retune(
    tuner: &mut SinkTuner,
    frequency: Option<u32>,
    events: &broadcast::Sender<BridgeEvent>,
) {
    match tuner.retune(frequency).await {
        Ok(Some(frequency_hz)) => {
            let _ = events.send(BridgeEvent::SinkTuned { frequency_hz });
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Output sink tuning failed"),
    }
}

async fn consumer_loop(
    ring: Arc<Mutex<IqRingBuffer>>,
    mut tuner: SinkTuner,
    mut retunes: mpsc::Receiver<Option<u32>>,
    events: broadcast::Sender<BridgeEvent>,
    backoff: Duration,
    cancel: CancellationToken,
) -> ConsumerStats {
    let mut stats = ConsumerStats::default();
    let mut burst: Vec<IqSample> = Vec::new();
    let mut was_ready = false;

    'run: loop {
        if cancel.is_cancelled() {
            break;
        }

        loop {
            match retunes.try_recv() {
                Ok(frequency) => apply_retune(&mut tuner, frequency, &events).await,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'run,
            }
        }

        let ready = tuner.is_ready();
        if ready != was_ready {
            debug!(ready, "Output sink readiness changed");
            was_ready = ready;
        }
        if !ready {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                request = retunes.recv() => match request {
                    Some(frequency) => apply_retune(&mut tuner, frequency, &events).await,
                    None => break,
                },
                _ = tokio::time::sleep(backoff) => {}
            }
            continue;
        }

        ring.lock().await.read_burst(&mut burst);
        let pushed = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            pushed = tuner.push_burst(&burst) => pushed,
        };
        match pushed {
            Ok(()) => stats.bursts_pushed += 1,
            Err(e) => {
                stats.push_errors += 1;
                if stats.push_errors == 1 {
                    warn!(error = %e, "Output sink rejected burst");
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }

    if let Err(e) = tuner.release().await {
        warn!(error = %e, "Output sink release failed");
    }
    info!(
        bursts = stats.bursts_pushed,
        errors = stats.push_errors,
        "IQ consumer stopped"
    );
    stats
}
