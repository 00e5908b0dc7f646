//! TX IQ sample extraction from control/IQ frames.
//!
//! Each 512-byte sub-block carries 63 groups of 8 bytes after its 8-byte
//! sync/control header: `L1 L0 R1 R0 I1 I0 Q1 Q0`. The audio pair is
//! ignored; I and Q are signed 16-bit big-endian values scaled to floats.

use hpsdr_core::{Error, IqSample, Result};

use crate::packet::FRAME_LEN;

/// Full-scale conversion factor, `1 / 32767`.
pub const SAMPLE_SCALE: f64 = 0.000030518509476;

/// TX IQ samples carried by one frame.
pub const SAMPLES_PER_FRAME: usize = 126;

/// Samples per 512-byte sub-block.
pub const SAMPLES_PER_BLOCK: usize = 63;

/// Payload offsets of the two sub-blocks, past their sync and control bytes.
pub const PAYLOAD_OFFSETS: [usize; 2] = [16, 528];

const GROUP_LEN: usize = 8;

/// Convert one big-endian 16-bit sample to a normalized float.
pub fn scale_sample(msb: u8, lsb: u8) -> f32 {
    (f64::from(i16::from_be_bytes([msb, lsb])) * SAMPLE_SCALE) as f32
}

/// Extract the 126 TX IQ samples from a control/IQ frame, in wire order.
pub fn tx_samples(frame: &[u8]) -> Result<Vec<IqSample>> {
    if frame.len() != FRAME_LEN {
        return Err(Error::InvalidLength {
            code: "control/iq",
            len: frame.len(),
            expected: FRAME_LEN,
        });
    }

    let mut samples = Vec::with_capacity(SAMPLES_PER_FRAME);
    for base in PAYLOAD_OFFSETS {
        let payload = &frame[base..base + SAMPLES_PER_BLOCK * GROUP_LEN];
        for group in payload.chunks_exact(GROUP_LEN) {
            samples.push(IqSample {
                i: scale_sample(group[4], group[5]),
                q: scale_sample(group[6], group[7]),
            });
        }
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_16_bit_value_scales_exactly() {
        for v in i16::MIN..=i16::MAX {
            let [msb, lsb] = v.to_be_bytes();
            let expected = (f64::from(v) * SAMPLE_SCALE) as f32;
            let got = scale_sample(msb, lsb);
            assert!(
                (got - expected).abs() <= f32::EPSILON,
                "value {v}: got {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn scale_extremes() {
        assert_eq!(scale_sample(0x00, 0x00), 0.0);
        assert!((scale_sample(0x7F, 0xFF) - 1.0).abs() < 1e-6);
        assert!((scale_sample(0x80, 0x00) + 1.000_030_5).abs() < 1e-6);
    }

    #[test]
    fn samples_taken_from_both_blocks_skipping_audio() {
        let mut frame = vec![0u8; FRAME_LEN];
        // First group of block 1: audio 0x1111 0x2222, I = 0x0100, Q = -1.
        frame[16..24].copy_from_slice(&[0x11, 0x11, 0x22, 0x22, 0x01, 0x00, 0xFF, 0xFF]);
        // Last group of block 1.
        frame[512..520].copy_from_slice(&[0, 0, 0, 0, 0x00, 0x02, 0x00, 0x03]);
        // Control bytes of block 2 must not be read as samples.
        frame[520..528].copy_from_slice(&[0x7F; 8]);
        // First group of block 2.
        frame[528..536].copy_from_slice(&[0, 0, 0, 0, 0x00, 0x04, 0x00, 0x05]);
        // Last group of block 2.
        frame[1024..1032].copy_from_slice(&[0, 0, 0, 0, 0x00, 0x06, 0x00, 0x07]);

        let samples = tx_samples(&frame).unwrap();
        assert_eq!(samples.len(), SAMPLES_PER_FRAME);
        assert_eq!(samples[0].i, scale_sample(0x01, 0x00));
        assert_eq!(samples[0].q, scale_sample(0xFF, 0xFF));
        assert_eq!(samples[62].i, scale_sample(0, 2));
        assert_eq!(samples[63].i, scale_sample(0, 4));
        assert_eq!(samples[63].q, scale_sample(0, 5));
        assert_eq!(samples[125].q, scale_sample(0, 7));
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(tx_samples(&[0u8; 1031]).is_err());
        assert!(tx_samples(&[0u8; 1033]).is_err());
    }
}
