//! SRAM unit facade.
//!
//! The SRAM unit addresses a 512 KiB external memory one byte at a time.
//! Mode 0 resets the unit's address logic, mode 1 shifts in the next
//! address byte (least significant first), mode 2 requests the byte at the
//! current address, mode 3 writes a byte to it. Requested bytes arrive
//! asynchronously; the `read_*` helpers wait on the unit's event bit.

use std::thread;
use std::time::{Duration, Instant};

use extpack_protocol::{AccessMode, UnitId};

use crate::error::{ReadError, SendError};
use crate::pack::ExtPack;

/// Number of address bytes the SRAM unit shifts in (19 significant bits).
const SRAM_ADDRESS_BYTES: usize = 3;

impl ExtPack {
    /// Reset the SRAM unit's address logic: address zero, next shifted-in
    /// byte is the least significant one.
    pub fn reset_sram_address(&self, unit: UnitId) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode0, 0x00)
    }

    /// Shift in the next address byte. The first call after a reset sets
    /// the least significant byte.
    pub fn push_sram_address_byte(&self, unit: UnitId, byte: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode1, byte)
    }

    /// Set the full access address (lower 19 bits of `address`), pacing the
    /// command pairs `byte_delay` apart with per-command retries.
    pub fn set_sram_address(
        &self,
        unit: UnitId,
        address: u32,
        byte_delay: Duration,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<(), SendError> {
        self.send_with_retry(
            extpack_protocol::encode_unit_byte(unit, AccessMode::Mode0),
            0x00,
            max_attempts,
            retry_delay,
        )?;
        for shift in 0..SRAM_ADDRESS_BYTES {
            thread::sleep(byte_delay);
            self.send_with_retry(
                extpack_protocol::encode_unit_byte(unit, AccessMode::Mode1),
                (address >> (8 * shift)) as u8,
                max_attempts,
                retry_delay,
            )?;
        }
        Ok(())
    }

    /// Write one byte to the previously set address.
    pub fn write_sram_byte(&self, unit: UnitId, data: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode3, data)
    }

    /// Set the address and write one byte to it.
    pub fn write_sram_byte_at(
        &self,
        unit: UnitId,
        address: u32,
        data: u8,
        byte_delay: Duration,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<(), SendError> {
        self.set_sram_address(unit, address, byte_delay, max_attempts, retry_delay)?;
        thread::sleep(byte_delay);
        self.send_with_retry(
            extpack_protocol::encode_unit_byte(unit, AccessMode::Mode3),
            data,
            max_attempts,
            retry_delay,
        )
    }

    /// Request the byte at the previously set address. The byte arrives
    /// asynchronously on the unit.
    pub fn request_sram_byte(&self, unit: UnitId) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode2, 0x00)
    }

    /// Request the byte at the previously set address and wait for it.
    pub fn read_sram_byte(&self, unit: UnitId, timeout: Duration) -> Result<u8, ReadError> {
        self.clear_event(unit);
        self.request_sram_byte(unit)?;
        let deadline = Instant::now() + timeout;
        loop {
            if self.take_event(unit) {
                return Ok(self.shadow_input(unit));
            }
            if Instant::now() >= deadline {
                return Err(ReadError::Timeout);
            }
            thread::sleep(self.config().ack_poll_tick);
        }
    }

    /// Set the address, request the byte there, and wait for it.
    #[allow(clippy::too_many_arguments)]
    pub fn read_sram_byte_at(
        &self,
        unit: UnitId,
        address: u32,
        byte_delay: Duration,
        max_attempts: u32,
        retry_delay: Duration,
        timeout: Duration,
    ) -> Result<u8, ReadError> {
        self.set_sram_address(unit, address, byte_delay, max_attempts, retry_delay)?;
        thread::sleep(byte_delay);
        self.read_sram_byte(unit, timeout)
    }
}
