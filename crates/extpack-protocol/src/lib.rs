//! ExtPack UART Wire Protocol
//!
//! This crate provides the wire-level types and the receive framing state
//! machine for talking to an ExtPack extension pack over a single UART link.
//! The ExtPack multiplexes up to 64 virtual I/O units (GPIO, UART
//! passthrough, timers, SPI, I2C, SRAM, …) over one fixed-rate 8N1
//! connection.
//!
//! # Protocol Overview
//!
//! Every exchange, in either direction, is a 2-byte **command pair**:
//!
//! ```text
//! +---------------------+-----------+
//! | mode:2 | unit:6     | data      |
//! +---------------------+-----------+
//!   byte 1 (unit byte)    byte 2
//! ```
//!
//! Bits 0–5 of the first byte select one of 64 units, bits 6–7 select a
//! unit-type-specific **access mode**. There is no length prefix, checksum
//! or frame marker; byte-pair alignment is maintained purely by the
//! [`PairDecoder`] state machine and a guard timer sized by
//! [`guard_timeout`].
//!
//! Units 0–2 are reserved by convention: unit 0 is the reset unit, unit 1
//! the error unit, unit 2 the acknowledge unit. Units 3–63 are free for
//! application assignment.
//!
//! # Example
//!
//! ```rust,ignore
//! use extpack_protocol::{AccessMode, CommandPair, LineStatus, PairDecoder, UnitId};
//!
//! // Build a command pair
//! let pair = CommandPair::new(UnitId::new(5)?, AccessMode::Mode0, 0x42);
//! let bytes = pair.encode();
//!
//! // Reassemble pairs from the wire
//! let mut decoder = PairDecoder::new();
//! decoder.push(bytes[0], LineStatus::CLEAN);
//! let step = decoder.push(bytes[1], LineStatus::CLEAN);
//! assert!(step.pair.is_some());
//! ```

mod constants;
mod decoder;
mod error;
mod types;

pub use constants::*;
pub use decoder::*;
pub use error::*;
pub use types::*;
