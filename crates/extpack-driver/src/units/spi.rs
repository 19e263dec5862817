//! SPI unit facade.
//!
//! Mode 0 clocks a data byte out to the currently selected slave; mode 1
//! selects the slave. Bytes the slave clocks back arrive asynchronously on
//! the same unit.

use std::time::Duration;

use extpack_protocol::{encode_unit_byte, AccessMode, UnitId};

use crate::error::SendError;
use crate::pack::ExtPack;

impl ExtPack {
    /// Clock one byte out to the currently selected SPI slave.
    pub fn send_spi_byte(&self, unit: UnitId, byte: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode0, byte)
    }

    /// Select the SPI slave following transfers go to. The sent id is
    /// shadowed and readable via [`spi_slave`](Self::spi_slave).
    pub fn set_spi_slave(&self, unit: UnitId, slave_id: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode1, slave_id)
    }

    /// Send a run of bytes to the currently selected slave, paced
    /// `byte_delay` apart with per-byte retries.
    pub fn send_spi_string(
        &self,
        unit: UnitId,
        data: &[u8],
        byte_delay: Duration,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<(), SendError> {
        self.send_string(
            encode_unit_byte(unit, AccessMode::Mode0),
            data,
            byte_delay,
            max_attempts,
            retry_delay,
        )
    }

    /// Last slave id sent to the unit. Pure cache read; if the pack never
    /// received the selection this still reports the attempted id.
    pub fn spi_slave(&self, unit: UnitId) -> u8 {
        self.shadow_output(unit)
    }

    /// Last byte received from the slave. Pure cache read.
    pub fn last_spi_byte(&self, unit: UnitId) -> u8 {
        self.shadow_input(unit)
    }
}
