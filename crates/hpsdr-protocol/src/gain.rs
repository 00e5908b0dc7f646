//! Derived floating-point gain factors for the hardware path.
//!
//! Attenuator, preamp and drive registers are integers on the wire; the
//! output path wants linear factors. [`GainFactors::recompute`] refreshes
//! only the factors whose inputs changed in the last decoded block.

use hpsdr_core::{DeviceProfile, Register};

use crate::registers::{RegisterBank, RegisterChange};

/// Linear gain factors derived from the control registers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainFactors {
    /// TX attenuation, `10^(-0.05 * txatt)`.
    pub tx_attenuation: f64,
    /// Per-receiver attenuation factors.
    pub rx_attenuation: [f64; 4],
    /// TX drive as a fraction of full scale, `txdrive / 256`.
    pub tx_drive: f64,
}

impl Default for GainFactors {
    fn default() -> Self {
        Self {
            tx_attenuation: 1.0,
            rx_attenuation: [1.0; 4],
            tx_drive: 0.99,
        }
    }
}

/// Convert an attenuation in dB to a linear voltage factor.
pub fn db_to_linear(attenuation_db: f64) -> f64 {
    10f64.powf(-0.05 * attenuation_db)
}

fn touches(changes: &[RegisterChange], registers: &[Register]) -> bool {
    changes.iter().any(|c| registers.contains(&c.register))
}

impl GainFactors {
    /// Recompute the factors affected by `changes`, which were all decoded
    /// from one control block of sub-page `page`. Returns `true` if
    /// anything was recomputed.
    pub fn recompute(
        &mut self,
        page: u8,
        changes: &[RegisterChange],
        bank: &RegisterBank,
        profile: DeviceProfile,
    ) -> bool {
        let reg = |r: Register| bank.get_or(r, 0) as f64;
        match page {
            0 if touches(
                changes,
                &[
                    Register::AlexAttenuator,
                    Register::Preamp,
                    Register::Dither,
                    Register::Random,
                ],
            ) =>
            {
                if profile.is_c25() {
                    self.rx_attenuation[0] = db_to_linear(
                        12.0 * reg(Register::AlexAttenuator)
                            - 18.0 * reg(Register::Dither)
                            - 18.0 * reg(Register::Preamp),
                    );
                } else {
                    self.rx_attenuation[0] = db_to_linear(
                        10.0 * reg(Register::AlexAttenuator) + reg(Register::RxAttenuator(0)),
                    );
                }
                self.rx_attenuation[1] = 1.0;
                true
            }
            9 if touches(changes, &[Register::TxDrive]) => {
                self.tx_drive = reg(Register::TxDrive) / 256.0;
                true
            }
            10 if !profile.is_c25()
                && touches(
                    changes,
                    &[Register::RxAttenuator(0), Register::Rx1AttEnable],
                ) =>
            {
                self.rx_attenuation[0] = db_to_linear(
                    10.0 * reg(Register::AlexAttenuator) + reg(Register::RxAttenuator(0)),
                );
                self.rx_attenuation[1] = db_to_linear(reg(Register::RxAttenuator(1)));
                self.rx_attenuation[2] = 1.0;
                self.rx_attenuation[3] = 1.0;
                true
            }
            11 if touches(changes, &[Register::RxAttenuator(1)]) => {
                self.rx_attenuation[1] = db_to_linear(reg(Register::RxAttenuator(1)));
                true
            }
            14 if touches(changes, &[Register::TxAttenuator]) => {
                self.tx_attenuation = db_to_linear(reg(Register::TxAttenuator));
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn set_all(bank: &mut RegisterBank, values: &[(Register, i64)]) -> Vec<RegisterChange> {
        values.iter().filter_map(|&(r, v)| bank.set(r, v)).collect()
    }

    #[test]
    fn defaults() {
        let g = GainFactors::default();
        assert_eq!(g.tx_attenuation, 1.0);
        assert_eq!(g.rx_attenuation, [1.0; 4]);
        assert_eq!(g.tx_drive, 0.99);
    }

    #[test]
    fn db_conversion() {
        assert!(approx(db_to_linear(0.0), 1.0));
        assert!(approx(db_to_linear(20.0), 0.1));
        assert!(approx(db_to_linear(-20.0), 10.0));
    }

    #[test]
    fn standard_alex_formula() {
        let mut bank = RegisterBank::new();
        bank.set(Register::RxAttenuator(0), 5);
        let changes = set_all(&mut bank, &[(Register::AlexAttenuator, 2), (Register::Preamp, 1)]);

        let mut g = GainFactors::default();
        g.rx_attenuation[1] = 0.5;
        assert!(g.recompute(0, &changes, &bank, DeviceProfile::Hermes));
        assert!(approx(g.rx_attenuation[0], db_to_linear(25.0)));
        assert_eq!(g.rx_attenuation[1], 1.0);
    }

    #[test]
    fn c25_formula() {
        let mut bank = RegisterBank::new();
        let changes = set_all(
            &mut bank,
            &[
                (Register::AlexAttenuator, 1),
                (Register::Dither, 1),
                (Register::Preamp, 1),
            ],
        );
        let mut g = GainFactors::default();
        assert!(g.recompute(0, &changes, &bank, DeviceProfile::C25));
        // 12 - 18 - 18 = -24 dB, i.e. gain.
        assert!(approx(g.rx_attenuation[0], db_to_linear(-24.0)));
    }

    #[test]
    fn unrelated_change_does_not_recompute() {
        let mut bank = RegisterBank::new();
        let changes = set_all(&mut bank, &[(Register::SampleRate, 1)]);
        let mut g = GainFactors::default();
        assert!(!g.recompute(0, &changes, &bank, DeviceProfile::Hermes));
        assert_eq!(g, GainFactors::default());
    }

    #[test]
    fn page10_sets_both_receivers() {
        let mut bank = RegisterBank::new();
        bank.set(Register::RxAttenuator(1), 20);
        let changes = set_all(&mut bank, &[(Register::RxAttenuator(0), 10)]);
        let mut g = GainFactors::default();
        assert!(g.recompute(10, &changes, &bank, DeviceProfile::Orion));
        assert!(approx(g.rx_attenuation[0], db_to_linear(10.0)));
        assert!(approx(g.rx_attenuation[1], 0.1));
        assert_eq!(g.rx_attenuation[2], 1.0);
    }

    #[test]
    fn page10_ignored_on_c25() {
        let mut bank = RegisterBank::new();
        let changes = set_all(&mut bank, &[(Register::RxAttenuator(0), 10)]);
        let mut g = GainFactors::default();
        assert!(!g.recompute(10, &changes, &bank, DeviceProfile::C25));
    }

    #[test]
    fn drive_and_tx_attenuation() {
        let mut bank = RegisterBank::new();
        let mut g = GainFactors::default();

        let changes = set_all(&mut bank, &[(Register::TxDrive, 128)]);
        assert!(g.recompute(9, &changes, &bank, DeviceProfile::Hermes));
        assert_eq!(g.tx_drive, 0.5);

        let changes = set_all(&mut bank, &[(Register::TxAttenuator, 20)]);
        assert!(g.recompute(14, &changes, &bank, DeviceProfile::Hermes));
        assert!(approx(g.tx_attenuation, 0.1));
    }
}
