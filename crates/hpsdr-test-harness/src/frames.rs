//! Builders for inbound protocol packets.
//!
//! These produce byte-exact packets as a PC client would send them, so
//! tests can exercise the bridge over real sockets.

use hpsdr_protocol::packet::{
    CMD_DATA, CMD_DISCOVERY, CMD_MAINTENANCE, CMD_START_STOP, COMMAND_LEN, DISCOVERY_LEN,
    ENDPOINT_EP2, ERASE_LEN, FRAME_LEN, MAGIC, SET_IP_LEN,
};

/// One control block: `C0 C1 C2 C3 C4`.
pub type ControlBlock = [u8; 5];

/// Control block for `page` with the PTT bit and four payload bytes.
pub fn block(page: u8, ptt: bool, c1: u8, c2: u8, c3: u8, c4: u8) -> ControlBlock {
    [(page << 1) | u8::from(ptt), c1, c2, c3, c4]
}

/// Control block carrying a big-endian 32-bit value (frequencies).
pub fn block_u32(page: u8, ptt: bool, value: u32) -> ControlBlock {
    let [c1, c2, c3, c4] = value.to_be_bytes();
    block(page, ptt, c1, c2, c3, c4)
}

/// Page 1 block setting the TX frequency.
pub fn tx_frequency(hz: u32) -> ControlBlock {
    block_u32(1, false, hz)
}

/// Page 0 block with the sample-rate code and receiver count.
pub fn general(rate_code: u8, receivers: u8) -> ControlBlock {
    let c4 = (receivers.saturating_sub(1) & 0x07) << 3;
    block(0, false, rate_code & 0x03, 0, 0, c4)
}

/// A 1032-byte control/IQ frame without TX samples.
pub fn control_frame(sequence: u32, blocks: [ControlBlock; 2]) -> Vec<u8> {
    control_frame_with_iq(sequence, blocks, &[])
}

/// A 1032-byte control/IQ frame. `iq` fills the TX I/Q slots in order (at
/// most 126 pairs); the rest stay silent.
pub fn control_frame_with_iq(sequence: u32, blocks: [ControlBlock; 2], iq: &[(i16, i16)]) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_LEN];
    frame[..2].copy_from_slice(&MAGIC);
    frame[2] = CMD_DATA;
    frame[3] = ENDPOINT_EP2;
    frame[4..8].copy_from_slice(&sequence.to_be_bytes());

    for (half, control) in blocks.iter().enumerate() {
        let base = 8 + half * 512;
        frame[base..base + 3].copy_from_slice(&[0x7F, 0x7F, 0x7F]);
        frame[base + 3..base + 8].copy_from_slice(control);
    }

    for (n, &(i, q)) in iq.iter().take(126).enumerate() {
        let half = n / 63;
        let offset = 16 + half * 512 + (n % 63) * 8;
        // L R audio first, then I and Q.
        frame[offset + 4..offset + 6].copy_from_slice(&i.to_be_bytes());
        frame[offset + 6..offset + 8].copy_from_slice(&q.to_be_bytes());
    }
    frame
}

/// A 63-byte discovery probe.
pub fn discovery() -> Vec<u8> {
    let mut packet = vec![0u8; DISCOVERY_LEN];
    packet[..2].copy_from_slice(&MAGIC);
    packet[2] = CMD_DISCOVERY;
    packet
}

/// A 64-byte start command with the given mode byte (`0x01` IQ).
pub fn start(mode: u8) -> Vec<u8> {
    let mut packet = vec![0u8; COMMAND_LEN];
    packet[..2].copy_from_slice(&MAGIC);
    packet[2] = CMD_START_STOP;
    packet[3] = mode;
    packet
}

/// A 64-byte stop command.
pub fn stop() -> Vec<u8> {
    start(0x00)
}

/// A 63-byte set-ip packet.
pub fn set_ip(mac: [u8; 6], ip: [u8; 4]) -> Vec<u8> {
    let mut packet = vec![0u8; SET_IP_LEN];
    packet[..2].copy_from_slice(&MAGIC);
    packet[2] = CMD_MAINTENANCE;
    packet[3..9].copy_from_slice(&mac);
    packet[9..13].copy_from_slice(&ip);
    packet
}

/// A 64-byte flash erase request.
pub fn erase() -> Vec<u8> {
    let mut packet = vec![0u8; ERASE_LEN];
    packet[..2].copy_from_slice(&MAGIC);
    packet[2] = CMD_MAINTENANCE;
    packet[3] = 0x02;
    packet
}
