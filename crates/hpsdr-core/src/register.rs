//! Identities of the hardware control registers carried in EP2 control blocks.
//!
//! A [`Register`] names one decoded field. Per-receiver and per-ADC
//! registers carry their zero-based index. Every register maps to a fixed
//! storage slot so a register bank can be a flat array.

use std::fmt;

/// Number of receiver frequency registers (sub-pages 2 through 8).
pub const RX_FREQUENCY_COUNT: u8 = 7;
/// Number of per-ADC preamp flags.
pub const ADC_PREAMP_COUNT: u8 = 4;
/// Number of per-receiver attenuator registers.
pub const RX_ATTENUATOR_COUNT: u8 = 2;
/// Number of receiver-to-ADC assignment registers.
pub const RX_ADC_COUNT: u8 = 7;

/// One hardware control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    // Decoded from every control block.
    Ptt,

    // Sub-page 0: general settings.
    SampleRate,
    Ref10Mhz,
    Src122Mhz,
    PmConfig,
    MicSource,
    TxClassE,
    OpenCollector,
    AlexAttenuator,
    Preamp,
    Dither,
    Random,
    AlexRxAntenna,
    AlexRxOut,
    AlexTxRelay,
    Duplex,
    Receivers,
    MicTimestamp,
    CommonMercuryFreq,

    // Sub-pages 1-8: frequencies.
    TxFrequency,
    RxFrequency(u8),

    // Sub-page 9: drive level and Alex filters.
    TxDrive,
    HermesConfig,
    AlexManualFilters,
    VnaMode,
    AlexHpf,
    AlexBypass,
    Lna6m,
    AlexTrDisable,
    AlexLpf,

    // Sub-page 10: preamps and attenuators.
    AdcPreamp(u8),
    TipRing,
    MicBias,
    MicPtt,
    LineGain,
    MercuryTxAtt0,
    PureSignal,
    PenelopeSelect,
    MetisDb9,
    MercuryTxAtt1,
    RxAttenuator(u8),
    Rx1AttEnable,

    // Sub-page 11: CW keyer.
    CwReversed,
    CwSpeed,
    CwMode,
    CwWeight,
    CwSpacing,

    // Sub-page 12.
    C25ExtBoardData,

    // Sub-page 14: ADC assignment and TX attenuator.
    RxAdc(u8),
    TxAttenuator,

    // Sub-pages 15-16: CW sidetone and timing.
    CwInternal,
    SidetoneVolume,
    CwDelay,
    CwHangTime,
    SidetoneFreq,
}

const RX_FREQ_BASE: usize = 20;
const TX_DRIVE_BASE: usize = RX_FREQ_BASE + RX_FREQUENCY_COUNT as usize;
const ADC_PREAMP_BASE: usize = TX_DRIVE_BASE + 9;
const TIP_RING_BASE: usize = ADC_PREAMP_BASE + ADC_PREAMP_COUNT as usize;
const RX_ATT_BASE: usize = TIP_RING_BASE + 9;
const CW_BASE: usize = RX_ATT_BASE + RX_ATTENUATOR_COUNT as usize;
const RX_ADC_BASE: usize = CW_BASE + 7;
const TAIL_BASE: usize = RX_ADC_BASE + RX_ADC_COUNT as usize;

/// Total number of register slots.
pub const REGISTER_COUNT: usize = TAIL_BASE + 6;

impl Register {
    /// Storage slot of this register, or `None` if an indexed register's
    /// index is out of range.
    pub fn slot(self) -> Option<usize> {
        use Register::*;
        let slot = match self {
            Ptt => 0,
            SampleRate => 1,
            Ref10Mhz => 2,
            Src122Mhz => 3,
            PmConfig => 4,
            MicSource => 5,
            TxClassE => 6,
            OpenCollector => 7,
            AlexAttenuator => 8,
            Preamp => 9,
            Dither => 10,
            Random => 11,
            AlexRxAntenna => 12,
            AlexRxOut => 13,
            AlexTxRelay => 14,
            Duplex => 15,
            Receivers => 16,
            MicTimestamp => 17,
            CommonMercuryFreq => 18,
            TxFrequency => 19,
            RxFrequency(n) if n < RX_FREQUENCY_COUNT => RX_FREQ_BASE + n as usize,
            TxDrive => TX_DRIVE_BASE,
            HermesConfig => TX_DRIVE_BASE + 1,
            AlexManualFilters => TX_DRIVE_BASE + 2,
            VnaMode => TX_DRIVE_BASE + 3,
            AlexHpf => TX_DRIVE_BASE + 4,
            AlexBypass => TX_DRIVE_BASE + 5,
            Lna6m => TX_DRIVE_BASE + 6,
            AlexTrDisable => TX_DRIVE_BASE + 7,
            AlexLpf => TX_DRIVE_BASE + 8,
            AdcPreamp(n) if n < ADC_PREAMP_COUNT => ADC_PREAMP_BASE + n as usize,
            TipRing => TIP_RING_BASE,
            MicBias => TIP_RING_BASE + 1,
            MicPtt => TIP_RING_BASE + 2,
            LineGain => TIP_RING_BASE + 3,
            MercuryTxAtt0 => TIP_RING_BASE + 4,
            PureSignal => TIP_RING_BASE + 5,
            PenelopeSelect => TIP_RING_BASE + 6,
            MetisDb9 => TIP_RING_BASE + 7,
            MercuryTxAtt1 => TIP_RING_BASE + 8,
            RxAttenuator(n) if n < RX_ATTENUATOR_COUNT => RX_ATT_BASE + n as usize,
            Rx1AttEnable => CW_BASE,
            CwReversed => CW_BASE + 1,
            CwSpeed => CW_BASE + 2,
            CwMode => CW_BASE + 3,
            CwWeight => CW_BASE + 4,
            CwSpacing => CW_BASE + 5,
            C25ExtBoardData => CW_BASE + 6,
            RxAdc(n) if n < RX_ADC_COUNT => RX_ADC_BASE + n as usize,
            TxAttenuator => TAIL_BASE,
            CwInternal => TAIL_BASE + 1,
            SidetoneVolume => TAIL_BASE + 2,
            CwDelay => TAIL_BASE + 3,
            CwHangTime => TAIL_BASE + 4,
            SidetoneFreq => TAIL_BASE + 5,
            RxFrequency(_) | AdcPreamp(_) | RxAttenuator(_) | RxAdc(_) => return None,
        };
        Some(slot)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::RxFrequency(n) => write!(f, "rx{}_frequency", n + 1),
            Register::AdcPreamp(n) => write!(f, "adc{}_preamp", n + 1),
            Register::RxAttenuator(n) => write!(f, "rx{}_attenuator", n + 1),
            Register::RxAdc(n) => write!(f, "rx{}_adc", n + 1),
            other => write!(f, "{other:?}"),
        }
    }
}
