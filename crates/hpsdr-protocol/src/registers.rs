//! Last-known values of every hardware control register.
//!
//! A fresh [`RegisterBank`] holds no values at all, so the first control
//! block decoded for a sub-page reports every one of its fields as changed.
//! The bank is written only by the EP2 decoder; the frame generator and the
//! gain calculations read it.

use hpsdr_core::{REGISTER_COUNT, Register};

/// A single register update reported by [`RegisterBank::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterChange {
    pub register: Register,
    /// Value before the update; `None` if the register was unset.
    pub old: Option<i64>,
    pub new: i64,
}

/// Store of control register values with change detection.
#[derive(Debug, Clone)]
pub struct RegisterBank {
    slots: [Option<i64>; REGISTER_COUNT],
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBank {
    /// Create a bank with every register unset.
    pub fn new() -> Self {
        Self {
            slots: [None; REGISTER_COUNT],
        }
    }

    /// Current value of `register`, or `None` if it was never decoded.
    pub fn get(&self, register: Register) -> Option<i64> {
        register.slot().and_then(|slot| self.slots[slot])
    }

    /// Current value of `register`, treating unset as `default`.
    pub fn get_or(&self, register: Register, default: i64) -> i64 {
        self.get(register).unwrap_or(default)
    }

    /// Store `value`. Returns the change if the value differs from the
    /// current one, `None` if it is identical.
    pub fn set(&mut self, register: Register, value: i64) -> Option<RegisterChange> {
        let slot = register.slot()?;
        let old = self.slots[slot];
        if old == Some(value) {
            return None;
        }
        self.slots[slot] = Some(value);
        Some(RegisterChange {
            register,
            old,
            new: value,
        })
    }

    /// Whether any register has been decoded yet.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    // -- Typed accessors used by the frame generator and IQ path --

    pub fn ptt(&self) -> bool {
        self.get_or(Register::Ptt, 0) != 0
    }

    /// Sample-rate code: 0 = 48 kHz, 1 = 96 kHz, 2 = 192 kHz, 3 = 384 kHz.
    pub fn sample_rate_code(&self) -> u8 {
        self.get_or(Register::SampleRate, 0) as u8
    }

    /// Number of active receivers, 1 when never set.
    pub fn receivers(&self) -> u8 {
        self.get_or(Register::Receivers, 1).clamp(1, 8) as u8
    }

    pub fn tx_frequency(&self) -> Option<u32> {
        self.get(Register::TxFrequency).map(|f| f as u32)
    }

    /// Raw TX drive level, 0-255.
    pub fn tx_drive(&self) -> u8 {
        self.get_or(Register::TxDrive, 0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_bank_is_unset() {
        let bank = RegisterBank::new();
        assert!(bank.is_empty());
        assert_eq!(bank.get(Register::Ptt), None);
        assert_eq!(bank.get(Register::RxFrequency(3)), None);
    }

    #[test]
    fn first_set_reports_change_from_unset() {
        let mut bank = RegisterBank::new();
        let change = bank.set(Register::SampleRate, 0).unwrap();
        assert_eq!(change.old, None);
        assert_eq!(change.new, 0);
        assert_eq!(bank.get(Register::SampleRate), Some(0));
    }

    #[test]
    fn identical_set_is_silent() {
        let mut bank = RegisterBank::new();
        assert!(bank.set(Register::TxDrive, 200).is_some());
        assert!(bank.set(Register::TxDrive, 200).is_none());
        let change = bank.set(Register::TxDrive, 100).unwrap();
        assert_eq!(change.old, Some(200));
        assert_eq!(change.new, 100);
    }

    #[test]
    fn indexed_registers_are_independent() {
        let mut bank = RegisterBank::new();
        bank.set(Register::RxFrequency(0), 7_074_000);
        bank.set(Register::RxFrequency(1), 14_074_000);
        assert_eq!(bank.get(Register::RxFrequency(0)), Some(7_074_000));
        assert_eq!(bank.get(Register::RxFrequency(1)), Some(14_074_000));
        assert_eq!(bank.get(Register::RxFrequency(2)), None);
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut bank = RegisterBank::new();
        assert!(bank.set(Register::RxFrequency(7), 1).is_none());
        assert!(bank.is_empty());
    }

    #[test]
    fn typed_accessor_defaults() {
        let bank = RegisterBank::new();
        assert!(!bank.ptt());
        assert_eq!(bank.receivers(), 1);
        assert_eq!(bank.sample_rate_code(), 0);
        assert_eq!(bank.tx_frequency(), None);
        assert_eq!(bank.tx_drive(), 0);
    }
}
