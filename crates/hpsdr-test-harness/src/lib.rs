//! hpsdr-test-harness: Test utilities for the HPSDR bridge.
//!
//! [`MockSink`] stands in for the IQ output device, [`RecordingOutput`]
//! captures EP6 frames without a socket, and [`frames`] builds inbound
//! packets the way a PC client would.

pub mod frames;
pub mod mock_sink;
pub mod recording;

pub use mock_sink::{MockSink, SinkCall, SinkProbe};
pub use recording::{RecordedFrame, RecordingOutput};
