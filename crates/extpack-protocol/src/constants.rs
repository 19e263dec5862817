//! Protocol constants
//!
//! These constants define the unit numbering, wire format parameters, and
//! payload values shared between the host driver and the ExtPack.

use std::time::Duration;

// ============================================================================
// Unit numbering
// ============================================================================

/// Total number of addressable units on the link.
pub const MAX_UNITS: usize = 64;

/// Mask selecting the unit number bits (0–5) of a unit byte.
pub const UNIT_MASK: u8 = 0x3F;

/// Bit position of the access mode field within a unit byte.
pub const ACCESS_MODE_SHIFT: u8 = 6;

/// Reserved unit number of the reset unit.
pub const RESET_UNIT: u8 = 0;
/// Reserved unit number of the error unit.
pub const ERROR_UNIT: u8 = 1;
/// Reserved unit number of the acknowledge unit.
pub const ACK_UNIT: u8 = 2;

// ============================================================================
// Payloads
// ============================================================================

/// Data byte carried by a reset notification or reset command on unit 0.
///
/// Sent host → ExtPack to reset the pack; sent ExtPack → host whenever the
/// pack itself was reset.
pub const RESET_NOTIFICATION: u8 = 0xFF;

/// Error-unit payload bit: the ExtPack failed to receive UART data from the host.
pub const PEER_ERR_HOST_RECEIVE: u8 = 1 << 0;
/// Error-unit payload bit: the ExtPack failed to send UART data to the host.
pub const PEER_ERR_PEER_SEND: u8 = 1 << 1;
/// Error-unit payload bit: the ExtPack failed to process a received command.
pub const PEER_ERR_PEER_PROCESSING: u8 = 1 << 2;

// ============================================================================
// Link timing
// ============================================================================

/// Default UART bit rate of the link. The frame format is fixed at 8N1.
pub const BAUD_RATE: u32 = 1_000_000;

/// Bits on the wire per byte with the 8N1 frame format (start + 8 data + stop).
pub const BITS_PER_FRAME: u32 = 10;

/// Guard timer length in UART bit periods.
///
/// The receive state machine arms a guard timer after the first byte of a
/// pair; if the second byte does not arrive within this window the state
/// machine resynchronizes to the pair boundary. The window is sized
/// comfortably above the on-wire time of one command pair so that a
/// delayed-but-valid data byte is never cut off.
pub const GUARD_TIMEOUT_BITS: u32 = 66;

/// Guard timer duration for a link running at `baud_rate` bits per second.
pub fn guard_timeout(baud_rate: u32) -> Duration {
    let micros = (GUARD_TIMEOUT_BITS as u64 * 1_000_000).div_ceil(baud_rate as u64);
    Duration::from_micros(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_timeout_at_default_baud() {
        // 66 bit periods at 1 MBaud are 66 microseconds.
        assert_eq!(guard_timeout(BAUD_RATE), Duration::from_micros(66));
    }

    #[test]
    fn test_guard_timeout_rounds_up() {
        // 66 bits at 9600 baud are 6875 microseconds exactly; at 115200 the
        // division is inexact and must round up, never down.
        assert_eq!(guard_timeout(9600), Duration::from_micros(6875));
        assert_eq!(guard_timeout(115_200), Duration::from_micros(573));
    }
}
