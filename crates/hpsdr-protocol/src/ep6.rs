//! EP6 outbound frame construction and pacing.
//!
//! While streaming, the radio sends one 1032-byte frame per interval. Each
//! frame carries two 512-byte sub-blocks; every sub-block starts with an
//! 8-byte status header taken from a rotating table of five entries
//! (versions, exciter/forward power, reverse power, supply voltage, spare),
//! followed by 504 bytes of receiver IQ and microphone samples. This bridge
//! has no receiver, so the IQ and microphone payload is silence.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use hpsdr_core::DeviceProfile;

use crate::packet::{CMD_DATA, ENDPOINT_EP6, FRAME_LEN, MAGIC};
use crate::registers::RegisterBank;

/// Payload bytes per sub-block after the status header.
pub const BLOCK_PAYLOAD_LEN: usize = 504;

/// Size of the status header at the start of each sub-block.
pub const STATUS_LEN: usize = 8;

/// Highest value of the 12-bit power ADC readings.
const POWER_FULL_SCALE: f64 = 4095.0;

/// Supply voltage reading reported in status position 3.
const SUPPLY_VOLTAGE: u8 = 63;

/// Rotating status headers: sync, then `C0 C1 C2 C3 C4`.
const STATUS_TABLE: [[u8; STATUS_LEN]; 5] = [
    [0x7F, 0x7F, 0x7F, 0x00, 0x00, 0x21, 0x11, 0x15],
    [0x7F, 0x7F, 0x7F, 0x08, 0x00, 0x00, 0x00, 0x00],
    [0x7F, 0x7F, 0x7F, 0x10, 0x00, 0x00, 0x00, 0x00],
    [0x7F, 0x7F, 0x7F, 0x18, 0x00, 0x00, 0x00, 0x00],
    [0x7F, 0x7F, 0x7F, 0x20, 0x42, 0x42, 0x42, 0x42],
];

/// Register values the generator needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ep6Params {
    pub receivers: u8,
    pub sample_rate_code: u8,
    pub tx_drive: u8,
    pub ptt: bool,
}

impl Default for Ep6Params {
    fn default() -> Self {
        Self {
            receivers: 1,
            sample_rate_code: 0,
            tx_drive: 0,
            ptt: false,
        }
    }
}

impl Ep6Params {
    /// Snapshot the relevant registers, treating unset ones as defaults.
    pub fn from_registers(bank: &RegisterBank) -> Self {
        Self {
            receivers: bank.receivers(),
            sample_rate_code: bank.sample_rate_code(),
            tx_drive: bank.tx_drive(),
            ptt: bank.ptt(),
        }
    }
}

/// Receiver sample groups that fit in one sub-block.
pub fn samples_per_block(receivers: u8) -> u64 {
    504 / (u64::from(receivers) * 6 + 2)
}

/// Interval between frames for the given receiver count and rate code.
///
/// Each frame carries two sub-blocks of samples; the interval is the time
/// those samples span at `48 kHz << rate`.
pub fn pacing_interval(receivers: u8, sample_rate_code: u8) -> Duration {
    let numerator = 2 * samples_per_block(receivers) * 1_000_000;
    let nanos = match 48u64.checked_shl(u32::from(sample_rate_code)) {
        Some(divisor) if divisor != 0 => numerator / divisor,
        _ => numerator,
    };
    Duration::from_nanos(nanos)
}

/// Forward power ADC reading for a relative TX level in `0.0..=1.0`.
pub fn forward_power(profile: DeviceProfile, level: f64) -> u16 {
    let info = profile.info();
    let reading = (POWER_FULL_SCALE / info.power_c1) * (100.0 * level * info.power_c2).sqrt();
    reading.clamp(0.0, POWER_FULL_SCALE) as u16
}

/// Stateful EP6 frame builder. A new builder starts at sequence 0.
#[derive(Debug)]
pub struct Ep6Builder {
    profile: DeviceProfile,
    sequence: u32,
    status_pos: usize,
}

impl Ep6Builder {
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            sequence: 0,
            status_pos: 0,
        }
    }

    /// Sequence number the next frame will carry.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Build the next frame and advance the sequence and status rotation.
    pub fn next_frame(&mut self, params: &Ep6Params) -> Bytes {
        let mut frame = BytesMut::with_capacity(FRAME_LEN);
        frame.put_slice(&MAGIC);
        frame.put_u8(CMD_DATA);
        frame.put_u8(ENDPOINT_EP6);
        frame.put_u32(self.sequence);
        self.sequence = self.sequence.wrapping_add(1);

        for _ in 0..2 {
            let status = self.next_status(params);
            frame.put_slice(&status);
            frame.put_bytes(0, BLOCK_PAYLOAD_LEN);
        }

        debug_assert_eq!(frame.len(), FRAME_LEN);
        frame.freeze()
    }

    fn next_status(&mut self, params: &Ep6Params) -> [u8; STATUS_LEN] {
        let pos = self.status_pos;
        self.status_pos = (self.status_pos + 1) % STATUS_TABLE.len();

        let mut status = STATUS_TABLE[pos];
        let hl2 = self.profile.is_hermes_lite2();
        match pos {
            0 if hl2 => {
                status[5] = 0;
                status[6] = 0;
            }
            1 => {
                status[4] = 0;
                // Hermes-Lite2 reports temperature here instead of drive.
                status[5] = if hl2 { 0 } else { params.tx_drive };
                let level = if params.ptt {
                    let drive = f64::from(params.tx_drive) / 256.0;
                    drive * drive
                } else {
                    0.0
                };
                let power = forward_power(self.profile, level).to_be_bytes();
                status[6] = power[0];
                status[7] = power[1];
            }
            3 => {
                status[6] = 0;
                status[7] = SUPPLY_VOLTAGE;
            }
            _ => {}
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hpsdr_core::Register;

    #[test]
    fn pacing_two_receivers_48k() {
        assert_eq!(samples_per_block(2), 36);
        let expected_ns: u64 = 2 * (504 / 14) * 1_000_000 / 48;
        assert_eq!(expected_ns, 1_500_000);
        assert_eq!(pacing_interval(2, 0), Duration::from_nanos(1_500_000));
    }

    #[test]
    fn pacing_scales_with_rate_and_receivers() {
        // One receiver: 63 samples per block.
        assert_eq!(pacing_interval(1, 0), Duration::from_nanos(2_625_000));
        assert_eq!(pacing_interval(1, 1), Duration::from_nanos(1_312_500));
        assert_eq!(pacing_interval(1, 3), Duration::from_nanos(328_125));
    }

    #[test]
    fn pacing_degenerate_divisor_falls_back() {
        assert_eq!(pacing_interval(1, 200), Duration::from_nanos(126_000_000));
    }

    #[test]
    fn frame_layout() {
        let mut builder = Ep6Builder::new(DeviceProfile::Hermes);
        let frame = builder.next_frame(&Ep6Params::default());
        assert_eq!(frame.len(), FRAME_LEN);
        assert_eq!(&frame[..4], &[0xEF, 0xFE, 0x01, 0x06]);
        assert_eq!(&frame[4..8], &[0, 0, 0, 0]);
        assert_eq!(&frame[8..16], &STATUS_TABLE[0]);
        assert_eq!(&frame[520..523], &[0x7F, 0x7F, 0x7F]);
        assert_eq!(frame[523], 0x08);
        assert!(frame[16..520].iter().all(|&b| b == 0));
        assert!(frame[528..].iter().all(|&b| b == 0));
    }

    #[test]
    fn sequence_increments_and_status_rotates() {
        let mut builder = Ep6Builder::new(DeviceProfile::Hermes);
        let params = Ep6Params::default();
        let mut c0s = Vec::new();
        for n in 0..5u32 {
            let frame = builder.next_frame(&params);
            assert_eq!(u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]), n);
            c0s.push(frame[11]);
            c0s.push(frame[523]);
        }
        assert_eq!(c0s, vec![0x00, 0x08, 0x10, 0x18, 0x20, 0x00, 0x08, 0x10, 0x18, 0x20]);
        assert_eq!(builder.sequence(), 5);
    }

    #[test]
    fn drive_and_power_in_position_one() {
        let mut builder = Ep6Builder::new(DeviceProfile::Hermes);
        let params = Ep6Params {
            tx_drive: 128,
            ptt: true,
            ..Ep6Params::default()
        };
        let frame = builder.next_frame(&params);
        let status = &frame[520..528];
        assert_eq!(status[5], 128);
        let power = u16::from_be_bytes([status[6], status[7]]);
        assert_eq!(power, forward_power(DeviceProfile::Hermes, 0.25));
        assert!(power > 0);
    }

    #[test]
    fn no_forward_power_without_ptt() {
        let mut builder = Ep6Builder::new(DeviceProfile::Hermes);
        let params = Ep6Params {
            tx_drive: 255,
            ..Ep6Params::default()
        };
        let frame = builder.next_frame(&params);
        assert_eq!(&frame[526..528], &[0, 0]);
    }

    #[test]
    fn supply_voltage_in_position_three() {
        let mut builder = Ep6Builder::new(DeviceProfile::Hermes);
        let params = Ep6Params::default();
        builder.next_frame(&params);
        let frame = builder.next_frame(&params);
        assert_eq!(&frame[520..528], &[0x7F, 0x7F, 0x7F, 0x18, 0, 0, 0, 63]);
    }

    #[test]
    fn hermes_lite2_status() {
        let mut builder = Ep6Builder::new(DeviceProfile::HermesLite2);
        let params = Ep6Params {
            tx_drive: 200,
            ..Ep6Params::default()
        };
        let frame = builder.next_frame(&params);
        assert_eq!(&frame[8..16], &[0x7F, 0x7F, 0x7F, 0x00, 0x00, 0x00, 0x00, 0x15]);
        assert_eq!(frame[525], 0);
    }

    #[test]
    fn forward_power_is_clamped() {
        assert_eq!(forward_power(DeviceProfile::Hermes, 0.0), 0);
        assert!(forward_power(DeviceProfile::Hermes, 1.0) <= 4095);
        assert_eq!(forward_power(DeviceProfile::Metis, 100.0), 4095);
    }

    #[test]
    fn params_from_registers() {
        let mut bank = RegisterBank::new();
        assert_eq!(Ep6Params::from_registers(&bank), Ep6Params::default());
        bank.set(Register::Receivers, 2);
        bank.set(Register::SampleRate, 1);
        bank.set(Register::Ptt, 1);
        let params = Ep6Params::from_registers(&bank);
        assert_eq!(params.receivers, 2);
        assert_eq!(params.sample_rate_code, 1);
        assert!(params.ptt);
    }
}
