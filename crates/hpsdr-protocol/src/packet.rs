//! Inbound packet classification for HPSDR Protocol-1.
//!
//! Every Protocol-1 packet starts with the magic bytes `EF FE` followed by a
//! command byte and a code byte. This module maps those four bytes plus the
//! packet length to a [`Packet`] kind, and tells a stream reader how many
//! bytes one protocol unit occupies. It has no I/O dependencies.

use hpsdr_core::{Error, MaintenanceKind, Result};

/// Protocol magic, the first two bytes of every packet.
pub const MAGIC: [u8; 2] = [0xEF, 0xFE];

/// Length of a control/IQ frame in both directions.
pub const FRAME_LEN: usize = 1032;
/// Length of a discovery probe.
pub const DISCOVERY_LEN: usize = 63;
/// Length of a start or stop command.
pub const COMMAND_LEN: usize = 64;
/// Length of a firmware program block.
pub const PROGRAM_LEN: usize = 264;
/// Length of an erase request.
pub const ERASE_LEN: usize = 64;
/// Length of a set-ip request.
pub const SET_IP_LEN: usize = 63;

/// Command byte of control/IQ frames.
pub const CMD_DATA: u8 = 0x01;
/// Command byte of discovery probes.
pub const CMD_DISCOVERY: u8 = 0x02;
/// Command byte of maintenance packets.
pub const CMD_MAINTENANCE: u8 = 0x03;
/// Command byte of start/stop commands.
pub const CMD_START_STOP: u8 = 0x04;

/// Endpoint carrying PC-to-radio control blocks and TX IQ.
pub const ENDPOINT_EP2: u8 = 0x02;
/// Endpoint carrying radio-to-PC status and RX IQ.
pub const ENDPOINT_EP6: u8 = 0x06;

/// Start code used only by the legacy TCP extension.
pub const START_TCP_LEGACY: u8 = 0x11;

/// What a start command asks the radio to stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// `04 01`: IQ only.
    Iq,
    /// `04 02`: bandscope only.
    Bandscope,
    /// `04 03`: IQ and bandscope.
    IqAndBandscope,
    /// `04 11`: legacy TCP start.
    TcpLegacy,
}

/// A classified inbound packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packet {
    /// 1032-byte control/IQ frame carrying its sequence number.
    ControlIq { sequence: u32 },
    Discovery,
    Stop,
    Start(StartMode),
    Maintenance(MaintenanceKind),
}

/// Read the 4-byte code at the start of `data`, if present.
pub fn code_of(data: &[u8]) -> Option<[u8; 4]> {
    data.get(..4)?.try_into().ok()
}

/// Number of bytes one protocol unit occupies on a stream transport, derived
/// from its leading code.
///
/// Discovery probes are 63 bytes and start and stop commands are 64.
/// Maintenance packets take their own lengths: program blocks 264, erase
/// requests 64 and set-ip requests 63. Every other unit is treated as a full
/// 1032-byte frame.
///
/// A stream carries no datagram boundaries, so a set-ip request whose first
/// MAC byte is `01` or `02` is read as a program block or erase request.
pub fn unit_len(code: [u8; 4]) -> usize {
    match code {
        [0xEF, 0xFE, CMD_DISCOVERY, 0x00] => DISCOVERY_LEN,
        [0xEF, 0xFE, CMD_START_STOP, 0x00] => COMMAND_LEN,
        [0xEF, 0xFE, CMD_START_STOP, 0x01 | 0x02 | 0x03 | START_TCP_LEGACY] => COMMAND_LEN,
        [0xEF, 0xFE, CMD_MAINTENANCE, 0x01] => PROGRAM_LEN,
        [0xEF, 0xFE, CMD_MAINTENANCE, 0x02] => ERASE_LEN,
        [0xEF, 0xFE, CMD_MAINTENANCE, _] => SET_IP_LEN,
        _ => FRAME_LEN,
    }
}

fn require_len(code: &'static str, data: &[u8], expected: usize) -> Result<()> {
    if data.len() == expected {
        Ok(())
    } else {
        Err(Error::InvalidLength {
            code,
            len: data.len(),
            expected,
        })
    }
}

/// Classify one inbound packet.
///
/// A recognized code with the wrong length yields
/// [`Error::InvalidLength`]; an unrecognized code yields [`Error::Protocol`].
/// Either way the caller must drop the packet unprocessed.
pub fn classify(data: &[u8]) -> Result<Packet> {
    let code = code_of(data)
        .ok_or_else(|| Error::Protocol(format!("packet too short: {} bytes", data.len())))?;

    if code[..2] != MAGIC {
        return Err(Error::Protocol(format!(
            "bad magic {:02X} {:02X}",
            code[0], code[1]
        )));
    }

    match (code[2], code[3]) {
        (CMD_DATA, ENDPOINT_EP2) => {
            require_len("control/iq", data, FRAME_LEN)?;
            let sequence = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
            Ok(Packet::ControlIq { sequence })
        }
        (CMD_DISCOVERY, 0x00) => {
            require_len("discovery", data, DISCOVERY_LEN)?;
            Ok(Packet::Discovery)
        }
        (CMD_START_STOP, 0x00) => {
            require_len("stop", data, COMMAND_LEN)?;
            Ok(Packet::Stop)
        }
        (CMD_START_STOP, mode @ (0x01 | 0x02 | 0x03 | START_TCP_LEGACY)) => {
            require_len("start", data, COMMAND_LEN)?;
            let mode = match mode {
                0x01 => StartMode::Iq,
                0x02 => StartMode::Bandscope,
                0x03 => StartMode::IqAndBandscope,
                _ => StartMode::TcpLegacy,
            };
            Ok(Packet::Start(mode))
        }
        (CMD_MAINTENANCE, sub) => match (sub, data.len()) {
            (0x01, PROGRAM_LEN) => Ok(Packet::Maintenance(MaintenanceKind::Program)),
            (0x02, ERASE_LEN) => Ok(Packet::Maintenance(MaintenanceKind::Erase)),
            (_, SET_IP_LEN) => Ok(Packet::Maintenance(MaintenanceKind::SetIp)),
            (_, len) => Err(Error::Protocol(format!(
                "unrecognized maintenance packet {sub:02X} with {len} bytes"
            ))),
        },
        (cmd, ep) => Err(Error::Protocol(format!(
            "unknown code EF FE {cmd:02X} {ep:02X}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(code: [u8; 4], len: usize) -> Vec<u8> {
        let mut data = vec![0u8; len];
        data[..4].copy_from_slice(&code);
        data
    }

    #[test]
    fn control_frame_with_sequence() {
        let mut data = packet([0xEF, 0xFE, 0x01, 0x02], FRAME_LEN);
        data[4..8].copy_from_slice(&0x0102_0304u32.to_be_bytes());
        assert_eq!(
            classify(&data).unwrap(),
            Packet::ControlIq {
                sequence: 0x0102_0304
            }
        );
    }

    #[test]
    fn short_control_frame_rejected() {
        let data = packet([0xEF, 0xFE, 0x01, 0x02], 1031);
        match classify(&data) {
            Err(Error::InvalidLength { len, expected, .. }) => {
                assert_eq!(len, 1031);
                assert_eq!(expected, 1032);
            }
            other => panic!("expected InvalidLength, got {other:?}"),
        }
    }

    #[test]
    fn discovery_and_commands() {
        assert_eq!(
            classify(&packet([0xEF, 0xFE, 0x02, 0x00], 63)).unwrap(),
            Packet::Discovery
        );
        assert_eq!(
            classify(&packet([0xEF, 0xFE, 0x04, 0x00], 64)).unwrap(),
            Packet::Stop
        );
        assert_eq!(
            classify(&packet([0xEF, 0xFE, 0x04, 0x01], 64)).unwrap(),
            Packet::Start(StartMode::Iq)
        );
        assert_eq!(
            classify(&packet([0xEF, 0xFE, 0x04, 0x03], 64)).unwrap(),
            Packet::Start(StartMode::IqAndBandscope)
        );
        assert_eq!(
            classify(&packet([0xEF, 0xFE, 0x04, 0x11], 64)).unwrap(),
            Packet::Start(StartMode::TcpLegacy)
        );
    }

    #[test]
    fn wrong_length_commands_rejected() {
        assert!(classify(&packet([0xEF, 0xFE, 0x02, 0x00], 64)).is_err());
        assert!(classify(&packet([0xEF, 0xFE, 0x04, 0x00], 63)).is_err());
        assert!(classify(&packet([0xEF, 0xFE, 0x04, 0x01], 1032)).is_err());
    }

    #[test]
    fn maintenance_packets() {
        assert_eq!(
            classify(&packet([0xEF, 0xFE, 0x03, 0x01], 264)).unwrap(),
            Packet::Maintenance(MaintenanceKind::Program)
        );
        assert_eq!(
            classify(&packet([0xEF, 0xFE, 0x03, 0x02], 64)).unwrap(),
            Packet::Maintenance(MaintenanceKind::Erase)
        );
        // Set-ip carries the first MAC byte in the code position.
        assert_eq!(
            classify(&packet([0xEF, 0xFE, 0x03, 0x00], 63)).unwrap(),
            Packet::Maintenance(MaintenanceKind::SetIp)
        );
        assert!(classify(&packet([0xEF, 0xFE, 0x03, 0x01], 100)).is_err());
    }

    #[test]
    fn garbage_rejected() {
        assert!(classify(&[]).is_err());
        assert!(classify(&[0xEF, 0xFE]).is_err());
        assert!(classify(&packet([0x00, 0x00, 0x01, 0x02], 1032)).is_err());
        assert!(classify(&packet([0xEF, 0xFE, 0x01, 0x06], 1032)).is_err());
    }

    #[test]
    fn stream_unit_lengths() {
        assert_eq!(unit_len([0xEF, 0xFE, 0x02, 0x00]), 63);
        assert_eq!(unit_len([0xEF, 0xFE, 0x04, 0x00]), 64);
        assert_eq!(unit_len([0xEF, 0xFE, 0x04, 0x01]), 64);
        assert_eq!(unit_len([0xEF, 0xFE, 0x04, 0x11]), 64);
        assert_eq!(unit_len([0xEF, 0xFE, 0x01, 0x02]), 1032);
        assert_eq!(unit_len([0x12, 0x34, 0x56, 0x78]), 1032);
    }

    #[test]
    fn maintenance_stream_unit_lengths() {
        assert_eq!(unit_len([0xEF, 0xFE, 0x03, 0x01]), PROGRAM_LEN);
        assert_eq!(unit_len([0xEF, 0xFE, 0x03, 0x02]), ERASE_LEN);
        assert_eq!(unit_len([0xEF, 0xFE, 0x03, 0xAA]), SET_IP_LEN);

        // Each unit classifies at the length the stream reader cut it to.
        let erase = packet([0xEF, 0xFE, 0x03, 0x02], unit_len([0xEF, 0xFE, 0x03, 0x02]));
        assert_eq!(
            classify(&erase).unwrap(),
            Packet::Maintenance(MaintenanceKind::Erase)
        );
        let set_ip = packet([0xEF, 0xFE, 0x03, 0xAA], unit_len([0xEF, 0xFE, 0x03, 0xAA]));
        assert_eq!(
            classify(&set_ip).unwrap(),
            Packet::Maintenance(MaintenanceKind::SetIp)
        );
    }
}
