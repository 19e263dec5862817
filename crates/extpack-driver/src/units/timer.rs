//! Timer unit facade.
//!
//! Timer access modes: 0 = enable, 1 = restart, 2 = prescaler, 3 = start
//! value. A timer unit fires its handler with the counter value whenever
//! the counter overflows on the pack.

use std::thread;
use std::time::Duration;

use extpack_protocol::{AccessMode, UnitId};

use crate::error::SendError;
use crate::pack::ExtPack;

impl ExtPack {
    /// Enable or disable a timer unit.
    pub fn set_timer_enabled(&self, unit: UnitId, enabled: bool) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode0, enabled as u8)
    }

    /// Restart a timer unit from its start value.
    pub fn restart_timer(&self, unit: UnitId) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode1, 0x00)
    }

    /// Set a timer unit's prescaler divisor.
    pub fn set_timer_prescaler(&self, unit: UnitId, divisor: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode2, divisor)
    }

    /// Set a timer unit's counter start value.
    pub fn set_timer_start_value(&self, unit: UnitId, start: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode3, start)
    }

    /// Fully configure a timer: disable, program prescaler and start value,
    /// restart, re-enable. Commands are paced `byte_delay` apart and each
    /// retried up to `max_attempts` times (0 = unlimited).
    ///
    /// Aborts at the first command that exhausts its attempts; the timer is
    /// then left disabled or partially programmed.
    pub fn configure_timer(
        &self,
        unit: UnitId,
        prescaler: u8,
        start_value: u8,
        byte_delay: Duration,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<(), SendError> {
        let steps: [(AccessMode, u8); 5] = [
            (AccessMode::Mode0, 0),           // disable while reprogramming
            (AccessMode::Mode2, prescaler),
            (AccessMode::Mode3, start_value),
            (AccessMode::Mode1, 0),           // restart from the new start value
            (AccessMode::Mode0, 1),           // enable
        ];
        for (index, (mode, data)) in steps.into_iter().enumerate() {
            if index > 0 {
                thread::sleep(byte_delay);
            }
            self.send_with_retry(
                extpack_protocol::encode_unit_byte(unit, mode),
                data,
                max_attempts,
                retry_delay,
            )?;
        }
        Ok(())
    }
}
