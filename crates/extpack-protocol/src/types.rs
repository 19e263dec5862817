//! Wire-level types: unit identifiers, access modes, command pairs.

use crate::constants::*;
use crate::error::ProtocolError;

// ============================================================================
// Unit identifiers
// ============================================================================

/// Identifier of one of the 64 virtual units multiplexed over the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u8);

impl UnitId {
    /// The reserved reset unit (unit 0).
    pub const RESET: UnitId = UnitId(RESET_UNIT);
    /// The reserved error unit (unit 1).
    pub const ERROR: UnitId = UnitId(ERROR_UNIT);
    /// The reserved acknowledge unit (unit 2).
    pub const ACK: UnitId = UnitId(ACK_UNIT);

    /// Create a unit identifier, checking the addressable range.
    pub fn new(unit: u8) -> Result<Self, ProtocolError> {
        if (unit as usize) < MAX_UNITS {
            Ok(UnitId(unit))
        } else {
            Err(ProtocolError::UnitOutOfRange(unit))
        }
    }

    /// Extract the unit identifier from a raw unit byte, discarding the
    /// access mode bits.
    pub fn from_unit_byte(byte: u8) -> Self {
        UnitId(byte & UNIT_MASK)
    }

    /// The raw unit number (0–63).
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// The unit number as an array index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "U{:02}", self.0)
    }
}

// ============================================================================
// Access modes
// ============================================================================

/// The 2-bit access mode field of a unit byte.
///
/// The meaning of each mode is unit-type-specific (for a timer unit: mode 0
/// is enable, mode 1 restart, mode 2 prescaler, mode 3 start value). Mode 0
/// is the "plain data" mode for every unit type; inbound application data
/// always carries mode 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Access mode 0b00, the primary data mode.
    Mode0,
    /// Access mode 0b01.
    Mode1,
    /// Access mode 0b10.
    Mode2,
    /// Access mode 0b11.
    Mode3,
}

impl AccessMode {
    /// Extract the access mode from a raw unit byte.
    pub fn from_unit_byte(byte: u8) -> Self {
        match (byte >> ACCESS_MODE_SHIFT) & 0b11 {
            0 => AccessMode::Mode0,
            1 => AccessMode::Mode1,
            2 => AccessMode::Mode2,
            _ => AccessMode::Mode3,
        }
    }

    /// The mode as its 2-bit field value.
    pub fn bits(&self) -> u8 {
        match self {
            AccessMode::Mode0 => 0,
            AccessMode::Mode1 => 1,
            AccessMode::Mode2 => 2,
            AccessMode::Mode3 => 3,
        }
    }

    /// True for mode 0, the only mode valid on inbound application data.
    pub fn is_primary(&self) -> bool {
        matches!(self, AccessMode::Mode0)
    }
}

/// Combine a unit identifier and access mode into a wire unit byte.
pub fn encode_unit_byte(unit: UnitId, mode: AccessMode) -> u8 {
    (mode.bits() << ACCESS_MODE_SHIFT) | unit.raw()
}

/// Split a wire unit byte into unit identifier and access mode.
pub fn split_unit_byte(byte: u8) -> (UnitId, AccessMode) {
    (UnitId::from_unit_byte(byte), AccessMode::from_unit_byte(byte))
}

// ============================================================================
// Command pairs
// ============================================================================

/// The atomic protocol message: a unit byte followed by a data byte.
///
/// Pairs are always transmitted back to back and are never interleaved with
/// the bytes of another pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPair {
    /// The first wire byte: access mode in bits 6–7, unit number in bits 0–5.
    pub unit_byte: u8,
    /// The second wire byte: the payload.
    pub data: u8,
}

impl CommandPair {
    /// Build a pair from unit, access mode and payload.
    pub fn new(unit: UnitId, mode: AccessMode, data: u8) -> Self {
        CommandPair {
            unit_byte: encode_unit_byte(unit, mode),
            data,
        }
    }

    /// Build a pair from an already-encoded unit byte.
    pub fn from_raw(unit_byte: u8, data: u8) -> Self {
        CommandPair { unit_byte, data }
    }

    /// The addressed unit.
    pub fn unit(&self) -> UnitId {
        UnitId::from_unit_byte(self.unit_byte)
    }

    /// The access mode carried by the unit byte.
    pub fn mode(&self) -> AccessMode {
        AccessMode::from_unit_byte(self.unit_byte)
    }

    /// The two bytes in wire order.
    pub fn encode(&self) -> [u8; 2] {
        [self.unit_byte, self.data]
    }

    /// Pack the pair into one 16-bit word, unit byte in the high half.
    ///
    /// This is the representation queued in the transmit ring buffer.
    pub fn to_word(&self) -> u16 {
        ((self.unit_byte as u16) << 8) | self.data as u16
    }

    /// Unpack a pair from its 16-bit word representation.
    pub fn from_word(word: u16) -> Self {
        CommandPair {
            unit_byte: (word >> 8) as u8,
            data: word as u8,
        }
    }
}

// ============================================================================
// Error unit payload
// ============================================================================

/// Decoded payload of an error-unit notification (ExtPack → host).
///
/// The pack reports link and processing problems out of band as a bitmask
/// on the reserved error unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeerError(u8);

impl PeerError {
    /// Wrap a raw error-unit payload byte.
    pub fn from_raw(byte: u8) -> Self {
        PeerError(byte)
    }

    /// The raw payload byte.
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// No error bits are set.
    pub fn is_clear(&self) -> bool {
        self.0 == 0
    }

    /// The pack failed to receive UART data sent by the host.
    pub fn host_receive_error(&self) -> bool {
        self.0 & PEER_ERR_HOST_RECEIVE != 0
    }

    /// The pack failed to send UART data to the host.
    pub fn peer_send_error(&self) -> bool {
        self.0 & PEER_ERR_PEER_SEND != 0
    }

    /// The pack failed to process a received command.
    pub fn peer_processing_error(&self) -> bool {
        self.0 & PEER_ERR_PEER_PROCESSING != 0
    }
}

impl std::fmt::Display for PeerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clear() {
            return write!(f, "none");
        }
        let mut first = true;
        let mut put = |f: &mut std::fmt::Formatter<'_>, name: &str| -> std::fmt::Result {
            if !first {
                write!(f, "+")?;
            }
            first = false;
            write!(f, "{}", name)
        };
        if self.host_receive_error() {
            put(f, "host-receive")?;
        }
        if self.peer_send_error() {
            put(f, "peer-send")?;
        }
        if self.peer_processing_error() {
            put(f, "peer-processing")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_id_range() {
        assert!(UnitId::new(0).is_ok());
        assert!(UnitId::new(63).is_ok());
        assert_eq!(UnitId::new(64), Err(ProtocolError::UnitOutOfRange(64)));
        assert_eq!(UnitId::new(255), Err(ProtocolError::UnitOutOfRange(255)));
    }

    #[test]
    fn test_access_mode_round_trip() {
        // Every unit number and mode must survive an encode/decode cycle.
        for unit in 0..64u8 {
            for mode in [
                AccessMode::Mode0,
                AccessMode::Mode1,
                AccessMode::Mode2,
                AccessMode::Mode3,
            ] {
                let id = UnitId::new(unit).expect("unit in range");
                let byte = encode_unit_byte(id, mode);
                let (decoded_unit, decoded_mode) = split_unit_byte(byte);
                assert_eq!(decoded_unit, id);
                assert_eq!(decoded_mode, mode);
            }
        }
    }

    #[test]
    fn test_command_pair_word_round_trip() {
        let pair = CommandPair::new(UnitId::new(37).expect("in range"), AccessMode::Mode2, 0xA5);
        assert_eq!(pair.unit_byte, 0b10_100101);
        let word = pair.to_word();
        assert_eq!(CommandPair::from_word(word), pair);
        assert_eq!(pair.encode(), [pair.unit_byte, 0xA5]);
    }

    #[test]
    fn test_peer_error_bits() {
        let err = PeerError::from_raw(PEER_ERR_HOST_RECEIVE | PEER_ERR_PEER_PROCESSING);
        assert!(err.host_receive_error());
        assert!(!err.peer_send_error());
        assert!(err.peer_processing_error());
        assert!(!err.is_clear());
        assert_eq!(err.to_string(), "host-receive+peer-processing");
        assert!(PeerError::default().is_clear());
    }
}
