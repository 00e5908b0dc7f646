//! Field layout of the EP2 control block.
//!
//! A control block is five bytes `C0 C1 C2 C3 C4`. Bit 0 of `C0` is PTT on
//! every block; `C0 >> 1` selects one of the sub-pages below, and the
//! remaining four bytes carry that sub-page's fields. The layout is data:
//! one [`FieldSpec`] per register, consumed by a single generic extractor.
//!
//! | Page | Contents                                   |
//! |------|--------------------------------------------|
//! | 0    | sample rate, clocks, Alex, receivers count |
//! | 1    | TX frequency                               |
//! | 2-8  | RX1-RX7 frequency                          |
//! | 9    | TX drive, Alex filters                     |
//! | 10   | preamps, mic, RX1 attenuator / HL gain     |
//! | 11   | RX2 attenuator, CW keyer                   |
//! | 12   | C25 extension board                        |
//! | 13   | reserved                                   |
//! | 14   | ADC assignment, TX attenuator              |
//! | 15   | CW internal, sidetone volume, CW delay     |
//! | 16   | CW hang time, sidetone frequency           |

use hpsdr_core::Register;

/// Number of bytes in one control block.
pub const BLOCK_LEN: usize = 5;

/// Highest sub-page with a defined layout.
pub const MAX_PAGE: u8 = 16;

/// How a register's value is taken from the block bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// `((C[byte] & mask) >> shift) + offset`
    Bits {
        byte: u8,
        mask: u8,
        shift: u8,
        offset: i64,
    },
    /// `base - (C[byte] & mask)`
    Inverted { byte: u8, mask: u8, base: i64 },
    /// Big-endian 32-bit value in `C1..=C4`.
    BeU32,
    /// `(C[hi] << hi_shift) | (C[lo] & lo_mask)`
    Concat {
        hi: u8,
        hi_shift: u8,
        lo: u8,
        lo_mask: u8,
    },
}

impl Extract {
    /// Apply this extraction to a control block.
    pub fn apply(&self, block: &[u8; BLOCK_LEN]) -> i64 {
        match *self {
            Extract::Bits {
                byte,
                mask,
                shift,
                offset,
            } => i64::from((block[byte as usize] & mask) >> shift) + offset,
            Extract::Inverted { byte, mask, base } => base - i64::from(block[byte as usize] & mask),
            Extract::BeU32 => i64::from(u32::from_be_bytes([block[1], block[2], block[3], block[4]])),
            Extract::Concat {
                hi,
                hi_shift,
                lo,
                lo_mask,
            } => (i64::from(block[hi as usize]) << hi_shift) | i64::from(block[lo as usize] & lo_mask),
        }
    }
}

/// One register's position in a control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub register: Register,
    pub extract: Extract,
}

const fn bits(register: Register, byte: u8, mask: u8, shift: u8) -> FieldSpec {
    FieldSpec {
        register,
        extract: Extract::Bits {
            byte,
            mask,
            shift,
            offset: 0,
        },
    }
}

const fn be_u32(register: Register) -> FieldSpec {
    FieldSpec {
        register,
        extract: Extract::BeU32,
    }
}

const fn concat(register: Register, hi: u8, hi_shift: u8, lo: u8, lo_mask: u8) -> FieldSpec {
    FieldSpec {
        register,
        extract: Extract::Concat {
            hi,
            hi_shift,
            lo,
            lo_mask,
        },
    }
}

/// PTT, present in every block.
pub const PTT: FieldSpec = bits(Register::Ptt, 0, 0x01, 0);

const PAGE_0: &[FieldSpec] = &[
    bits(Register::SampleRate, 1, 0x03, 0),
    bits(Register::Ref10Mhz, 1, 0x0C, 2),
    bits(Register::Src122Mhz, 1, 0x10, 4),
    bits(Register::PmConfig, 1, 0x60, 5),
    bits(Register::MicSource, 1, 0x80, 7),
    bits(Register::TxClassE, 2, 0x01, 0),
    bits(Register::OpenCollector, 2, 0xFE, 1),
    bits(Register::AlexAttenuator, 3, 0x03, 0),
    bits(Register::Preamp, 3, 0x04, 2),
    bits(Register::Dither, 3, 0x08, 3),
    bits(Register::Random, 3, 0x10, 4),
    bits(Register::AlexRxAntenna, 3, 0x60, 5),
    bits(Register::AlexRxOut, 3, 0x80, 7),
    bits(Register::AlexTxRelay, 4, 0x03, 0),
    bits(Register::Duplex, 4, 0x04, 2),
    FieldSpec {
        register: Register::Receivers,
        extract: Extract::Bits {
            byte: 4,
            mask: 0x38,
            shift: 3,
            offset: 1,
        },
    },
    bits(Register::MicTimestamp, 4, 0x40, 6),
    bits(Register::CommonMercuryFreq, 4, 0x80, 7),
];

const PAGE_1: &[FieldSpec] = &[be_u32(Register::TxFrequency)];
const PAGE_2: &[FieldSpec] = &[be_u32(Register::RxFrequency(0))];
const PAGE_3: &[FieldSpec] = &[be_u32(Register::RxFrequency(1))];
const PAGE_4: &[FieldSpec] = &[be_u32(Register::RxFrequency(2))];
const PAGE_5: &[FieldSpec] = &[be_u32(Register::RxFrequency(3))];
const PAGE_6: &[FieldSpec] = &[be_u32(Register::RxFrequency(4))];
const PAGE_7: &[FieldSpec] = &[be_u32(Register::RxFrequency(5))];
const PAGE_8: &[FieldSpec] = &[be_u32(Register::RxFrequency(6))];

const PAGE_9: &[FieldSpec] = &[
    bits(Register::TxDrive, 1, 0xFF, 0),
    bits(Register::HermesConfig, 2, 0x3F, 0),
    bits(Register::AlexManualFilters, 2, 0x40, 6),
    bits(Register::VnaMode, 2, 0x80, 7),
    bits(Register::AlexHpf, 3, 0x1F, 0),
    bits(Register::AlexBypass, 3, 0x20, 5),
    bits(Register::Lna6m, 3, 0x40, 6),
    bits(Register::AlexTrDisable, 3, 0x80, 7),
    bits(Register::AlexLpf, 4, 0xFF, 0),
];

const PAGE_10: &[FieldSpec] = &[
    bits(Register::AdcPreamp(0), 1, 0x01, 0),
    bits(Register::AdcPreamp(1), 1, 0x02, 1),
    bits(Register::AdcPreamp(2), 1, 0x04, 2),
    bits(Register::AdcPreamp(3), 1, 0x08, 3),
    bits(Register::TipRing, 1, 0x10, 4),
    bits(Register::MicBias, 1, 0x20, 5),
    bits(Register::MicPtt, 1, 0x40, 6),
    bits(Register::LineGain, 2, 0x1F, 0),
    bits(Register::MercuryTxAtt0, 2, 0x20, 5),
    bits(Register::PureSignal, 2, 0x40, 6),
    bits(Register::PenelopeSelect, 2, 0x80, 7),
    bits(Register::MetisDb9, 3, 0x0F, 0),
    bits(Register::MercuryTxAtt1, 3, 0x10, 4),
];

/// Bit 6 of `C4` on page 10 selects the Hermes-Lite combined gain encoding.
pub const HL_GAIN_FLAG: u8 = 0x40;

const PAGE_10_HL_GAIN: &[FieldSpec] = &[FieldSpec {
    register: Register::RxAttenuator(0),
    extract: Extract::Inverted {
        byte: 4,
        mask: 0x3F,
        base: 37,
    },
}];

const PAGE_10_ATTENUATOR: &[FieldSpec] = &[
    bits(Register::RxAttenuator(0), 4, 0x1F, 0),
    bits(Register::Rx1AttEnable, 4, 0x20, 5),
];

const PAGE_11: &[FieldSpec] = &[
    bits(Register::RxAttenuator(1), 1, 0x1F, 0),
    bits(Register::CwReversed, 2, 0x40, 6),
    bits(Register::CwSpeed, 3, 0x3F, 0),
    bits(Register::CwMode, 3, 0xC0, 6),
    bits(Register::CwWeight, 4, 0x7F, 0),
    bits(Register::CwSpacing, 4, 0x80, 7),
];

const PAGE_12: &[FieldSpec] = &[concat(Register::C25ExtBoardData, 2, 8, 1, 0xFF)];

const PAGE_14: &[FieldSpec] = &[
    bits(Register::RxAdc(0), 1, 0x03, 0),
    bits(Register::RxAdc(1), 1, 0x0C, 2),
    bits(Register::RxAdc(2), 1, 0x30, 4),
    bits(Register::RxAdc(3), 1, 0xC0, 6),
    bits(Register::RxAdc(4), 2, 0x03, 0),
    bits(Register::RxAdc(5), 2, 0x0C, 2),
    bits(Register::RxAdc(6), 2, 0x30, 4),
    bits(Register::TxAttenuator, 3, 0x1F, 0),
];

const PAGE_15: &[FieldSpec] = &[
    bits(Register::CwInternal, 1, 0x01, 0),
    bits(Register::SidetoneVolume, 2, 0xFF, 0),
    bits(Register::CwDelay, 3, 0xFF, 0),
];

const PAGE_16: &[FieldSpec] = &[
    concat(Register::CwHangTime, 1, 2, 2, 0x03),
    concat(Register::SidetoneFreq, 3, 4, 4, 0x0F),
];

/// Sub-page selected by a control block.
pub fn page_of(block: &[u8; BLOCK_LEN]) -> u8 {
    block[0] >> 1
}

/// Fields carried by `page`, not counting PTT. The page-10 layout depends on
/// `C4`, so the whole block is passed in. Undefined and reserved pages have
/// no fields.
pub fn page_fields(page: u8, block: &[u8; BLOCK_LEN]) -> [&'static [FieldSpec]; 2] {
    let empty: &'static [FieldSpec] = &[];
    match page {
        0 => [PAGE_0, empty],
        1 => [PAGE_1, empty],
        2 => [PAGE_2, empty],
        3 => [PAGE_3, empty],
        4 => [PAGE_4, empty],
        5 => [PAGE_5, empty],
        6 => [PAGE_6, empty],
        7 => [PAGE_7, empty],
        8 => [PAGE_8, empty],
        9 => [PAGE_9, empty],
        10 if block[4] & HL_GAIN_FLAG != 0 => [PAGE_10, PAGE_10_HL_GAIN],
        10 => [PAGE_10, PAGE_10_ATTENUATOR],
        11 => [PAGE_11, empty],
        12 => [PAGE_12, empty],
        14 => [PAGE_14, empty],
        15 => [PAGE_15, empty],
        16 => [PAGE_16, empty],
        _ => [empty, empty],
    }
}
