//! EP2 control block decoder.
//!
//! Every inbound control/IQ frame carries two control blocks. The decoder
//! extracts each block's fields per the [`layout`](crate::layout) table,
//! stores them in the [`RegisterBank`] and reports one [`RegisterChange`]
//! per field whose value actually moved. Gain factors are refreshed when a
//! relevant field changed.

use hpsdr_core::{DeviceProfile, Error, Register, Result};

use crate::gain::GainFactors;
use crate::layout::{self, BLOCK_LEN};
use crate::packet::FRAME_LEN;
use crate::registers::{RegisterBank, RegisterChange};

/// Offsets of the two control blocks inside a 1032-byte frame.
pub const CONTROL_BLOCK_OFFSETS: [usize; 2] = [11, 523];

/// Register bank plus the gain factors derived from it.
#[derive(Debug, Clone, Default)]
pub struct RadioState {
    pub registers: RegisterBank,
    pub gains: GainFactors,
}

/// ADC assignment the C25 board wires in hardware.
const C25_RX_ADC: [i64; 3] = [0, 1, 1];

/// Stateless decoder bound to one device profile.
#[derive(Debug, Clone, Copy)]
pub struct Ep2Decoder {
    profile: DeviceProfile,
}

impl Ep2Decoder {
    pub fn new(profile: DeviceProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    /// Decode one 5-byte control block into `state`.
    ///
    /// Sub-pages without a layout only update PTT.
    pub fn decode_block(&self, state: &mut RadioState, block: &[u8; BLOCK_LEN]) -> Vec<RegisterChange> {
        let mut changes = Vec::new();

        if let Some(change) = state
            .registers
            .set(layout::PTT.register, layout::PTT.extract.apply(block))
        {
            changes.push(change);
        }

        let page = layout::page_of(block);
        for spec in layout::page_fields(page, block).iter().flat_map(|f| f.iter()) {
            if let Some(change) = state.registers.set(spec.register, spec.extract.apply(block)) {
                changes.push(change);
            }
        }

        if page == 14 && self.profile.is_c25() {
            for (idx, &adc) in C25_RX_ADC.iter().enumerate() {
                if let Some(change) = state.registers.set(Register::RxAdc(idx as u8), adc) {
                    changes.push(change);
                }
            }
        }

        if !changes.is_empty() {
            let RadioState { registers, gains } = state;
            if gains.recompute(page, &changes, registers, self.profile) {
                tracing::debug!(page, gains = ?gains, "Gain factors recomputed");
            }
        }

        changes
    }

    /// Decode both control blocks of a control/IQ frame.
    ///
    /// The frame must be exactly 1032 bytes; otherwise nothing is touched.
    pub fn decode_frame(&self, state: &mut RadioState, frame: &[u8]) -> Result<Vec<RegisterChange>> {
        if frame.len() != FRAME_LEN {
            return Err(Error::InvalidLength {
                code: "control/iq",
                len: frame.len(),
                expected: FRAME_LEN,
            });
        }

        let mut changes = Vec::new();
        for offset in CONTROL_BLOCK_OFFSETS {
            let mut block = [0u8; BLOCK_LEN];
            block.copy_from_slice(&frame[offset..offset + BLOCK_LEN]);
            changes.extend(self.decode_block(state, &block));
        }
        Ok(changes)
    }
}
