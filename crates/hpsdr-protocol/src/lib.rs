//! hpsdr-protocol: Pure HPSDR Protocol-1 codecs.
//!
//! Nothing in this crate touches a socket or spawns a task. It classifies
//! inbound packets, decodes EP2 control blocks into a register bank,
//! extracts TX IQ samples into a ring buffer, and builds discovery replies
//! and EP6 frames. The `hpsdr-bridge` crate drives it from the network.

pub mod discovery;
pub mod ep2;
pub mod ep6;
pub mod gain;
pub mod layout;
pub mod packet;
pub mod registers;
pub mod ring;
pub mod samples;

pub use ep2::{Ep2Decoder, RadioState};
pub use ep6::{Ep6Builder, Ep6Params, pacing_interval};
pub use gain::GainFactors;
pub use packet::{Packet, StartMode, classify};
pub use registers::{RegisterBank, RegisterChange};
pub use ring::{IqRingBuffer, RingStats};
