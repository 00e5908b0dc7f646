//! Outbound frame transport.
//!
//! The [`FrameOutput`] trait abstracts over where generated EP6 frames go.
//! The session's link sends them to the UDP peer that issued the start
//! command or to the attached TCP client; tests substitute a recorder from
//! the `hpsdr-test-harness` crate so the frame generator can be exercised
//! without sockets.

use async_trait::async_trait;

use crate::error::Result;

/// Destination for outbound 1032-byte frames.
#[async_trait]
pub trait FrameOutput: Send + Sync {
    /// Send one complete frame.
    ///
    /// Returns [`Error::NotConnected`](crate::error::Error::NotConnected)
    /// when no peer is attached and
    /// [`Error::ConnectionLost`](crate::error::Error::ConnectionLost) when
    /// the TCP client failed mid-send.
    async fn send_frame(&self, frame: &[u8]) -> Result<()>;

    /// Whether a peer is currently attached.
    fn is_connected(&self) -> bool;
}
