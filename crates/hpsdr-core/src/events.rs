//! Asynchronous bridge event types.
//!
//! The session emits events through a [`tokio::sync::broadcast`] channel.
//! Front ends and tests subscribe to them to observe the protocol without
//! scraping logs.
//!
//! [`tokio::sync::broadcast`]: https://docs.rs/tokio/latest/tokio/sync/broadcast/index.html

use std::net::SocketAddr;

use crate::register::Register;

/// An event emitted by the bridge.
///
/// Delivery is best-effort through a bounded broadcast channel; a slow
/// subscriber may miss register changes during a burst of control frames.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// A control register took a new value.
    RegisterChanged {
        register: Register,
        /// Previous value, `None` if the register had never been set.
        old: Option<i64>,
        new: i64,
    },

    /// An inbound control/IQ frame did not carry the expected sequence number.
    SequenceGap {
        expected: u32,
        received: u32,
    },

    /// A packet was dropped without being processed.
    FrameDropped {
        reason: String,
    },

    /// A discovery probe was answered.
    DiscoveryAnswered {
        /// Whether the reply advertised an active stream.
        active: bool,
    },

    /// A start command was accepted and the frame generator is running.
    Started {
        /// UDP peer, or `None` when streaming over the TCP client.
        peer: Option<SocketAddr>,
    },

    /// The frame generator stopped.
    Stopped {
        /// `true` if the generator did not exit in time and was aborted.
        forced: bool,
    },

    /// A TCP client became the active transport.
    ClientAttached {
        addr: SocketAddr,
    },

    /// The TCP client was closed.
    ClientDetached,

    /// The IQ output sink was (re)initialized at a new TX frequency.
    SinkTuned {
        frequency_hz: u32,
    },

    /// A band filter was selected for the current TX frequency.
    FilterSelected {
        band: String,
        lpf: u32,
        hpf: u32,
    },
}
