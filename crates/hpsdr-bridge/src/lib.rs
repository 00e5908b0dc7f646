//! hpsdr-bridge: Network side of the HPSDR Protocol-1 bridge.
//!
//! A [`SessionManager`] answers discovery, decodes the client's control
//! frames, streams EP6 frames while started, and feeds the client's TX IQ
//! through a ring buffer into an [`IqSink`](hpsdr_core::IqSink). Build one
//! with [`SessionBuilder`].
//!
//! # Tasks
//!
//! - the session poll loop, driven by [`SessionManager::run`]
//! - one EP6 generator per start command ([`generator`])
//! - one IQ consumer for the session's lifetime ([`consumer`])

pub mod builder;
pub mod consumer;
pub mod generator;
pub mod link;
pub mod session;
pub mod tuner;

pub use builder::SessionBuilder;
pub use consumer::{ConsumerHandle, ConsumerStats};
pub use generator::{GeneratorHandle, GeneratorStats, StopOutcome};
pub use link::Link;
pub use session::{SessionManager, SessionStats};
pub use tuner::SinkTuner;
