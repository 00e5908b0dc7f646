//! Firmware maintenance packets (program, erase, set-ip).
//!
//! These packets share the `EF FE 03` prefix. The bridge recognizes them by
//! length and prefix only and hands them whole to a [`MaintenanceHandler`].
//! Whatever the handler returns is sent back to the sender over UDP.

use std::net::Ipv4Addr;

use crate::types::MacAddress;

/// The kind of maintenance packet that was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceKind {
    /// 264-byte firmware block upload, `EF FE 03 01`.
    Program,
    /// 64-byte flash erase request, `EF FE 03 02`.
    Erase,
    /// 63-byte IP address assignment, `EF FE 03 xx`.
    SetIp,
}

/// Handler for maintenance packets.
///
/// Implementations must not block; they run on the session's poll loop.
pub trait MaintenanceHandler: Send + Sync {
    /// Handle one packet. The returned bytes, if any, are sent to the
    /// packet's source address.
    fn handle(&self, kind: MaintenanceKind, packet: &[u8]) -> Option<Vec<u8>>;
}

/// Default handler: logs the request and sends nothing back.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreMaintenance;

impl MaintenanceHandler for IgnoreMaintenance {
    fn handle(&self, kind: MaintenanceKind, packet: &[u8]) -> Option<Vec<u8>> {
        match kind {
            MaintenanceKind::Program => {
                let blocks = packet
                    .get(4..8)
                    .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                    .unwrap_or(0);
                tracing::info!(blocks, "Ignoring firmware program packet");
            }
            MaintenanceKind::Erase => {
                tracing::info!("Ignoring flash erase packet");
            }
            MaintenanceKind::SetIp => match parse_set_ip(packet) {
                Some((mac, ip)) => {
                    tracing::info!(mac = %mac, ip = %ip, "Ignoring set-ip packet");
                }
                None => tracing::info!("Ignoring malformed set-ip packet"),
            },
        }
        None
    }
}

/// Extract the target MAC (bytes 3..9) and new address (bytes 9..13) from a
/// set-ip packet.
pub fn parse_set_ip(packet: &[u8]) -> Option<(MacAddress, Ipv4Addr)> {
    let mac: [u8; 6] = packet.get(3..9)?.try_into().ok()?;
    let ip: [u8; 4] = packet.get(9..13)?.try_into().ok()?;
    Some((MacAddress(mac), Ipv4Addr::from(ip)))
}
