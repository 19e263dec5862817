//! UART passthrough unit facade.

use std::time::Duration;

use extpack_protocol::{encode_unit_byte, AccessMode, UnitId};

use crate::error::SendError;
use crate::pack::ExtPack;

impl ExtPack {
    /// Send one byte out of a UART passthrough unit.
    pub fn send_uart_byte(&self, unit: UnitId, byte: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode0, byte)
    }

    /// Send a run of bytes out of a UART passthrough unit, paced
    /// `byte_delay` apart, retrying each byte up to `max_attempts` times
    /// (0 = unlimited) with `retry_delay` between attempts.
    pub fn send_uart_string(
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

    /// Last byte received on a UART passthrough unit. Pure cache read.
    pub fn last_uart_byte(&self, unit: UnitId) -> u8 {
        self.shadow_input(unit)
    }
}
