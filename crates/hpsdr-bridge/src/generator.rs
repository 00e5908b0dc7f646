//! EP6 frame generator task.
//!
//! While streaming, a spawned task emits one EP6 frame per pacing interval
//! on absolute deadlines, so a late wake-up is followed by catch-up frames
//! rather than a permanent drift. Pacing follows the receiver count and
//! sample rate currently held in the register bank.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use hpsdr_core::transport::FrameOutput;
use hpsdr_core::types::DeviceProfile;
use hpsdr_protocol::{Ep6Builder, Ep6Params, RadioState, pacing_interval};

/// What the generator needs from the session.
#[derive(Clone)]
pub struct GeneratorContext {
    pub profile: DeviceProfile,
    pub state: Arc<Mutex<RadioState>>,
    pub output: Arc<dyn FrameOutput>,
}

/// Counters returned when the generator exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneratorStats {
    pub frames_sent: u64,
    pub send_errors: u64,
}

/// How a stop request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The task observed the cancellation and exited.
    Clean(GeneratorStats),
    /// The task did not exit in time (or panicked) and was aborted.
    Forced,
}

impl StopOutcome {
    pub fn is_forced(&self) -> bool {
        matches!(self, StopOutcome::Forced)
    }
}

/// Handle to a running generator. Dropping it cancels the task.
#[derive(Debug)]
pub struct GeneratorHandle {
    cancel: CancellationToken,
    active: Arc<AtomicBool>,
    task: JoinHandle<GeneratorStats>,
}

impl GeneratorHandle {
    /// Whether the task is still producing frames.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Cancel the task and wait up to `timeout` for it to exit.
    pub async fn stop(mut self, timeout: Duration) -> StopOutcome {
        self.cancel.cancel();
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(stats)) => StopOutcome::Clean(stats),
            Ok(Err(e)) => {
                error!(error = %e, "EP6 generator task failed");
                self.active.store(false, Ordering::Release);
                StopOutcome::Forced
            }
            Err(_) => {
                error!(
                    timeout_ms = timeout.as_millis() as u64,
                    "EP6 generator did not stop in time, aborting"
                );
                self.task.abort();
                self.active.store(false, Ordering::Release);
                StopOutcome::Forced
            }
        }
    }
}

impl Drop for GeneratorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// Spawn
// ---------------------------------------------------------------------------

/// Spawn a generator. Sequence numbering starts at 0 for every spawn.
pub fn spawn_generator(ctx: GeneratorContext) -> GeneratorHandle {
    let cancel = CancellationToken::new();
    let active = Arc::new(AtomicBool::new(true));
    let task = tokio::spawn(generator_loop(ctx, cancel.clone(), active.clone()));
    GeneratorHandle {
        cancel,
        active,
        task,
    }
}

async fn generator_loop(
    ctx: GeneratorContext,
    cancel: CancellationToken,
    active: Arc<AtomicBool>,
) -> GeneratorStats {
    let mut builder = Ep6Builder::new(ctx.profile);
    let mut stats = GeneratorStats::default();
    let mut deadline = Instant::now();
    let mut last_params: Option<Ep6Params> = None;

    info!(profile = %ctx.profile, "EP6 generator started");

    loop {
        let params = {
            let state = ctx.state.lock().await;
            Ep6Params::from_registers(&state.registers)
        };
        if last_params.is_none_or(|p| {
            p.receivers != params.receivers || p.sample_rate_code != params.sample_rate_code
        }) {
            debug!(
                receivers = params.receivers,
                rate_code = params.sample_rate_code,
                interval_us = pacing_interval(params.receivers, params.sample_rate_code).as_micros() as u64,
                "EP6 pacing"
            );
        }
        last_params = Some(params);

        deadline += pacing_interval(params.receivers, params.sample_rate_code);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(deadline) => {}
        }

        let frame = builder.next_frame(&params);
        match ctx.output.send_frame(&frame).await {
            Ok(()) => stats.frames_sent += 1,
            Err(e) => {
                stats.send_errors += 1;
                if stats.send_errors == 1 {
                    warn!(error = %e, "EP6 send failed");
                }
            }
        }
    }

    active.store(false, Ordering::Release);
    info!(
        frames = stats.frames_sent,
        send_errors = stats.send_errors,
        "EP6 generator stopped"
    );
    stats
}
