//! Driver error types.
//!
//! Causes collapse into a small set of variants: `NotReady` is the only
//! retryable send failure (hardware register busy, pair in flight, or
//! transmit queue full all look the same to the caller), `InvalidUnit` is a
//! caller bug. Receive-side line corruption never surfaces here; it is
//! absorbed by the framing state machine and reported out of band by the
//! pack's error unit.

use thiserror::Error;

/// Errors constructing a driver engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The configured unit count is zero or above the protocol maximum.
    #[error("unit count {0} not in 1..=64")]
    UnitCountOutOfRange(usize),

    /// The configured baud rate is zero.
    #[error("baud rate must be nonzero")]
    InvalidBaudRate,
}

/// Errors from the outbound path.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The addressed unit is outside the configured unit count. Nothing was
    /// put on the wire; retrying cannot help.
    #[error("unit {0} outside the configured unit range")]
    InvalidUnit(u8),

    /// The transmit path cannot take the pair right now: a pair is still in
    /// flight, the hardware register is occupied, or the transmit queue is
    /// full. Retryable.
    #[error("transmit path busy")]
    NotReady,
}

/// Errors from the synchronous acknowledge layer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckError {
    /// No acknowledgment arrived within the caller's timeout.
    #[error("no acknowledgment within the timeout")]
    Timeout,

    /// An acknowledgment arrived but carried unexpected data. Without
    /// sequence numbers this is indistinguishable from a late or reordered
    /// acknowledgment of some other operation.
    #[error("acknowledgment data mismatch: expected 0x{expected:02X}, got 0x{received:02X}")]
    Mismatch {
        /// The data byte the caller expected to be acknowledged.
        expected: u8,
        /// The data byte the acknowledgment actually carried.
        received: u8,
    },
}

/// Errors from request-and-wait reads (SRAM and similar units).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Issuing the read request failed.
    #[error("read request failed: {0}")]
    Send(#[from] SendError),

    /// The requested byte never arrived within the timeout.
    #[error("no data within the timeout")]
    Timeout,
}
