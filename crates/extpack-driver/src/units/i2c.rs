//! I2C unit facade.
//!
//! Mode 0 writes a data byte to the configured partner, mode 1 sets the
//! partner address, mode 2 requests one byte from the partner. Requested
//! bytes arrive asynchronously on the same unit.

use extpack_protocol::{AccessMode, UnitId};

use crate::error::SendError;
use crate::pack::ExtPack;

impl ExtPack {
    /// Write one byte to the configured I2C partner.
    pub fn send_i2c_byte(&self, unit: UnitId, byte: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode0, byte)
    }

    /// Set the I2C partner address following transfers go to. The sent
    /// address is shadowed and readable via
    /// [`i2c_partner`](Self::i2c_partner).
    pub fn set_i2c_partner(&self, unit: UnitId, address: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode1, address)
    }

    /// Request one byte from the configured partner. The byte arrives
    /// asynchronously; wait on the unit's event bit or poll
    /// [`last_i2c_byte`](Self::last_i2c_byte).
    pub fn request_i2c_byte(&self, unit: UnitId) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode2, 0x00)
    }

    /// Last partner address sent to the unit. Pure cache read of the
    /// attempted value.
    pub fn i2c_partner(&self, unit: UnitId) -> u8 {
        self.shadow_output(unit)
    }

    /// Last byte received from the partner. Pure cache read.
    pub fn last_i2c_byte(&self, unit: UnitId) -> u8 {
        self.shadow_input(unit)
    }
}
