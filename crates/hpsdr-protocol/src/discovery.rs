//! Discovery replies.
//!
//! A client finds radios by broadcasting a 63-byte `EF FE 02` probe. The
//! radio answers with a 60-byte frame: magic, a state byte (2 idle, 3
//! streaming), its MAC address, software version and device class, then
//! zero padding.

use hpsdr_core::{DeviceProfile, MacAddress};

/// Length of a discovery reply.
pub const REPLY_LEN: usize = 60;

/// State byte of an idle radio.
pub const STATE_IDLE: u8 = 2;
/// State byte of a radio that is already streaming.
pub const STATE_ACTIVE: u8 = 3;

/// Build a discovery reply for `profile`.
pub fn build_reply(profile: DeviceProfile, mac: MacAddress, active: bool) -> [u8; REPLY_LEN] {
    let info = profile.info();
    let mut reply = [0u8; REPLY_LEN];
    reply[0] = 0xEF;
    reply[1] = 0xFE;
    reply[2] = if active { STATE_ACTIVE } else { STATE_IDLE };
    reply[3..9].copy_from_slice(&mac.octets());
    reply[9] = info.firmware_version;
    reply[10] = info.device_class;
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_hermes_reply() {
        let reply = build_reply(DeviceProfile::Hermes, MacAddress::default(), false);
        assert_eq!(
            &reply[..11],
            &[0xEF, 0xFE, 2, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 31, 1]
        );
        assert!(reply[11..].iter().all(|&b| b == 0));
    }

    #[test]
    fn active_state_byte() {
        let reply = build_reply(DeviceProfile::Orion, MacAddress::default(), true);
        assert_eq!(reply[2], STATE_ACTIVE);
        assert_eq!(reply[10], 5);
    }

    #[test]
    fn class_byte_matches_every_profile() {
        for profile in DeviceProfile::ALL {
            let reply = build_reply(profile, MacAddress::default(), false);
            assert_eq!(reply[10], profile.info().device_class, "{profile}");
            assert_eq!(reply[9], profile.info().firmware_version, "{profile}");
        }
    }

    #[test]
    fn hermes_lite2_identity() {
        let reply = build_reply(DeviceProfile::HermesLite2, MacAddress::default(), false);
        assert_eq!(reply[9], 41);
        assert_eq!(reply[10], 6);
    }

    #[test]
    fn custom_mac() {
        let mac: MacAddress = "00:1c:c0:a2:13:dd".parse().unwrap();
        let reply = build_reply(DeviceProfile::Metis, mac, false);
        assert_eq!(&reply[3..9], &[0x00, 0x1C, 0xC0, 0xA2, 0x13, 0xDD]);
    }
}
