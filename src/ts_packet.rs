//! TS packet filter (component C).
//!
//! Parses a single 188-octet TS packet header and, for packets on the
//! configured PID that pass the sync/error/payload checks, returns the
//! PUSI flag and the payload slice. All other packets are dropped here:
//! no downstream effect on the PES accumulator.

use crate::ts_framer::TS_PACKET_SIZE;

/// Inspect one TS packet against the configured target PID.
///
/// Returns `None` if the packet must be dropped (bad sync byte,
/// transport-error indicator set, PID mismatch, no payload present, or an
/// adaptation field that pushes the payload offset past the end of the
/// packet). Returns `Some((pusi, payload))` otherwise.
pub fn inspect(packet: &[u8; TS_PACKET_SIZE], target_pid: u16) -> Option<(bool, &[u8])> {
    if packet[0] != 0x47 {
        return None;
    }
    let transport_error = packet[1] & 0x80 != 0;
    if transport_error {
        return None;
    }
    let pusi = packet[1] & 0x40 != 0;
    let pid = (((packet[1] & 0x1f) as u16) << 8) | packet[2] as u16;
    if pid != target_pid {
        return None;
    }
    let adaptation_present = packet[3] & 0x20 != 0;
    let payload_present = packet[3] & 0x10 != 0;
    if !payload_present {
        return None;
    }
    let offset = if adaptation_present {
        5usize + packet[4] as usize
    } else {
        4usize
    };
    if offset >= TS_PACKET_SIZE {
        return None;
    }
    let payload = &packet[offset..];
    if payload.is_empty() {
        return None;
    }
    Some((pusi, payload))
}
