//! Shared domain types: emulated device profiles, IQ samples, MAC addresses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Device profiles
// ---------------------------------------------------------------------------

/// The hardware personality the bridge presents to SDR client software.
///
/// Selected once at startup. The profile determines the identity bytes in
/// discovery replies, the forward-power calibration constants used in EP6
/// telemetry, and which receive-gain formula the EP2 decoder applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceProfile {
    Metis,
    #[default]
    Hermes,
    Griffin,
    Angelia,
    Orion,
    OrionMkII,
    HermesLite,
    HermesLite2,
    /// Red Pitaya STEMlab / C25 class boards.
    C25,
}

/// Static identity and calibration data for one [`DeviceProfile`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileInfo {
    /// Display name (e.g. "Hermes-Lite2").
    pub name: &'static str,
    /// Internal device identifier. Hermes-Lite2 uses 1006, which does not
    /// fit in the discovery class byte.
    pub device_id: u16,
    /// Forward power calibration constant: full-scale bridge voltage.
    pub power_c1: f64,
    /// Forward power calibration constant: bridge coupling factor.
    pub power_c2: f64,
    /// Software version byte reported in discovery replies.
    pub firmware_version: u8,
    /// Device class byte reported in discovery replies.
    pub device_class: u8,
}

const PROFILES: [(DeviceProfile, ProfileInfo); 9] = [
    (DeviceProfile::Metis, info("Metis", 0, 3.3, 0.090, 31, 0)),
    (DeviceProfile::Hermes, info("Hermes", 1, 3.3, 0.095, 31, 1)),
    (DeviceProfile::Griffin, info("Griffin", 2, 3.3, 0.095, 31, 2)),
    (DeviceProfile::Angelia, info("Angelia", 4, 3.3, 0.095, 31, 4)),
    (DeviceProfile::Orion, info("Orion", 5, 5.0, 0.108, 31, 5)),
    (DeviceProfile::OrionMkII, info("Orion-MkII", 10, 5.0, 0.108, 31, 10)),
    (DeviceProfile::HermesLite, info("Hermes-Lite", 6, 3.3, 0.095, 31, 6)),
    (DeviceProfile::HermesLite2, info("Hermes-Lite2", 1006, 3.3, 0.095, 41, 6)),
    (DeviceProfile::C25, info("C25", 100, 3.3, 0.090, 31, 100)),
];

const fn info(
    name: &'static str,
    device_id: u16,
    power_c1: f64,
    power_c2: f64,
    firmware_version: u8,
    device_class: u8,
) -> ProfileInfo {
    ProfileInfo {
        name,
        device_id,
        power_c1,
        power_c2,
        firmware_version,
        device_class,
    }
}

impl DeviceProfile {
    /// All supported profiles, in discovery-id order.
    pub const ALL: [DeviceProfile; 9] = [
        DeviceProfile::Metis,
        DeviceProfile::Hermes,
        DeviceProfile::Griffin,
        DeviceProfile::Angelia,
        DeviceProfile::Orion,
        DeviceProfile::OrionMkII,
        DeviceProfile::HermesLite,
        DeviceProfile::HermesLite2,
        DeviceProfile::C25,
    ];

    /// Look up the identity and calibration data for this profile.
    pub fn info(self) -> &'static ProfileInfo {
        // The table is indexed in the same order as `ALL`.
        let idx = self as usize;
        &PROFILES[idx].1
    }

    /// Whether this profile uses the C25 attenuator/preamp gain formula.
    pub fn is_c25(self) -> bool {
        self == DeviceProfile::C25
    }

    /// Whether this profile is a Hermes-Lite2, which reports temperature
    /// instead of TX drive in its status sub-blocks.
    pub fn is_hermes_lite2(self) -> bool {
        self == DeviceProfile::HermesLite2
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info().name)
    }
}

/// Error returned when a string cannot be parsed into a [`DeviceProfile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProfileError(String);

impl fmt::Display for ParseProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown emulation: '{}'", self.0)
    }
}

impl std::error::Error for ParseProfileError {}

impl FromStr for DeviceProfile {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "metis" => Ok(DeviceProfile::Metis),
            "hermes" => Ok(DeviceProfile::Hermes),
            "griffin" => Ok(DeviceProfile::Griffin),
            "angelia" => Ok(DeviceProfile::Angelia),
            "orion" => Ok(DeviceProfile::Orion),
            "orion2" | "orionmkii" | "orionmk2" => Ok(DeviceProfile::OrionMkII),
            "hermeslite" | "hl1" | "hermeslite1" => Ok(DeviceProfile::HermesLite),
            "hermeslite2" | "hl2" => Ok(DeviceProfile::HermesLite2),
            "c25" | "stemlab" | "redpitaya" => Ok(DeviceProfile::C25),
            _ => Err(ParseProfileError(s.to_string())),
        }
    }
}

impl TryFrom<String> for DeviceProfile {
    type Error = ParseProfileError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DeviceProfile> for String {
    fn from(profile: DeviceProfile) -> Self {
        profile.info().name.to_string()
    }
}

// ---------------------------------------------------------------------------
// IQ samples
// ---------------------------------------------------------------------------

/// One complex transmit sample, normalized to roughly `[-1.0, 1.0)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IqSample {
    pub i: f32,
    pub q: f32,
}

impl IqSample {
    /// The zero sample; unwritten ring slots read as this.
    pub const SILENCE: IqSample = IqSample { i: 0.0, q: 0.0 };

    pub fn new(i: f32, q: f32) -> Self {
        Self { i, q }
    }
}

// ---------------------------------------------------------------------------
// MAC address
// ---------------------------------------------------------------------------

/// A 6-byte hardware address reported in discovery replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl Default for MacAddress {
    fn default() -> Self {
        MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Error returned when a string is not a valid `aa:bb:cc:dd:ee:ff` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMacError(String);

impl fmt::Display for ParseMacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid MAC address: '{}'", self.0)
    }
}

impl std::error::Error for ParseMacError {}

impl FromStr for MacAddress {
    type Err = ParseMacError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(ParseMacError(s.to_string()));
        }
        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 {
                return Err(ParseMacError(s.to_string()));
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| ParseMacError(s.to_string()))?;
        }
        Ok(MacAddress(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ParseMacError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_table_matches_enum_order() {
        for (idx, profile) in DeviceProfile::ALL.iter().enumerate() {
            assert_eq!(PROFILES[idx].0, *profile);
        }
    }

    #[test]
    fn calibration_constants() {
        let orion = DeviceProfile::Orion.info();
        assert_eq!(orion.power_c1, 5.0);
        assert_eq!(orion.power_c2, 0.108);

        let metis = DeviceProfile::Metis.info();
        assert_eq!(metis.power_c1, 3.3);
        assert_eq!(metis.power_c2, 0.090);

        let hermes = DeviceProfile::Hermes.info();
        assert_eq!(hermes.power_c2, 0.095);
    }

    #[test]
    fn hermes_lite2_reports_hl1_class() {
        let hl2 = DeviceProfile::HermesLite2.info();
        assert_eq!(hl2.device_id, 1006);
        assert_eq!(hl2.device_class, 6);
        assert_eq!(hl2.firmware_version, 41);
    }

    #[test]
    fn discovery_class_equals_id_for_single_byte_ids() {
        for profile in DeviceProfile::ALL {
            let info = profile.info();
            if info.device_id <= u8::MAX as u16 {
                assert_eq!(info.device_class as u16, info.device_id, "{profile}");
            }
        }
    }

    #[test]
    fn parse_profile_names() {
        assert_eq!("hermes".parse::<DeviceProfile>().unwrap(), DeviceProfile::Hermes);
        assert_eq!("Orion2".parse::<DeviceProfile>().unwrap(), DeviceProfile::OrionMkII);
        assert_eq!("Hermes-Lite2".parse::<DeviceProfile>().unwrap(), DeviceProfile::HermesLite2);
        assert_eq!("hl2".parse::<DeviceProfile>().unwrap(), DeviceProfile::HermesLite2);
        assert_eq!("STEMlab".parse::<DeviceProfile>().unwrap(), DeviceProfile::C25);
        assert!("anan-7000".parse::<DeviceProfile>().is_err());
    }

    #[test]
    fn profile_display_round_trip() {
        for profile in DeviceProfile::ALL {
            let s = profile.to_string();
            assert_eq!(s.parse::<DeviceProfile>().unwrap(), profile);
        }
    }

    #[test]
    fn mac_parse_and_display() {
        let mac: MacAddress = "00:1c:c0:A2:13:DD".parse().unwrap();
        assert_eq!(mac.octets(), [0x00, 0x1C, 0xC0, 0xA2, 0x13, 0xDD]);
        assert_eq!(mac.to_string(), "00:1c:c0:a2:13:dd");
    }

    #[test]
    fn mac_rejects_garbage() {
        assert!("00:1c:c0".parse::<MacAddress>().is_err());
        assert!("00:1c:c0:a2:13:zz".parse::<MacAddress>().is_err());
        assert!("001:c:c0:a2:13:dd".parse::<MacAddress>().is_err());
    }

    #[test]
    fn mac_default() {
        assert_eq!(MacAddress::default().to_string(), "aa:bb:cc:dd:ee:ff");
    }
}
