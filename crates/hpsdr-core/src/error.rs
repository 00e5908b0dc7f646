//! Error types for the HPSDR bridge.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Socket failures, malformed packets,
//! output-sink failures and configuration problems are all captured here.

/// The error type for all bridge operations.
///
/// Frame-level variants ([`Error::InvalidLength`], [`Error::Protocol`]) are
/// produced by the pure decoders and are never fatal to the session: the
/// poll loop logs them and drops the packet. Socket and configuration
/// errors are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (UDP socket, TCP client).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (unknown code, bad sync bytes).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A packet with a recognized code arrived with the wrong length.
    #[error("invalid length for {code}: got {len} bytes, expected {expected}")]
    InvalidLength {
        /// Name of the packet kind that was recognized.
        code: &'static str,
        /// Length actually received.
        len: usize,
        /// Length the packet kind requires.
        expected: usize,
    },

    /// Timed out waiting for a task or socket.
    #[error("timeout")]
    Timeout,

    /// No peer is attached to send outbound frames to.
    #[error("not connected")]
    NotConnected,

    /// The TCP client went away mid-session.
    #[error("connection lost")]
    ConnectionLost,

    /// The IQ output sink has not been initialized yet.
    #[error("output sink not ready")]
    SinkNotReady,

    /// An invalid parameter was passed (frequency out of range, bad MAC).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The configuration file could not be read or validated.
    #[error("configuration error: {0}")]
    Config(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error only affects a single packet and the session can
    /// carry on.
    pub fn is_frame_level(&self) -> bool {
        matches!(self, Error::InvalidLength { .. } | Error::Protocol(_))
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
