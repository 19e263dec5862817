//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when working with the wire protocol.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Unit number outside the addressable range (0–63).
    #[error("unit number {0} out of range (max {max})", max = crate::MAX_UNITS - 1)]
    UnitOutOfRange(u8),
}
