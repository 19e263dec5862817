//! GPIO unit facade.
//!
//! Mode 0 writes the output pin register; mode 1 asks the pack to resend
//! the current input pin states, which then arrive asynchronously like any
//! other inbound data.

use extpack_protocol::{AccessMode, UnitId};

use crate::error::SendError;
use crate::pack::ExtPack;

impl ExtPack {
    /// Set the output pins of a GPIO unit. The sent value is shadowed and
    /// readable via [`gpio_output`](Self::gpio_output).
    pub fn set_gpio_output(&self, unit: UnitId, pins: u8) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode0, pins)
    }

    /// Request a refresh of a GPIO unit's input pin states.
    ///
    /// The refreshed value arrives asynchronously; read it afterwards with
    /// [`gpio_input`](Self::gpio_input) or wait on the unit's event bit.
    pub fn refresh_gpio(&self, unit: UnitId) -> Result<(), SendError> {
        self.send_to(unit, AccessMode::Mode1, 0x00)
    }

    /// Last received input pin states. Pure cache read.
    pub fn gpio_input(&self, unit: UnitId) -> u8 {
        self.shadow_input(unit)
    }

    /// Last sent output pin states. Pure cache read; reflects what was
    /// attempted, not what the pack confirmed.
    pub fn gpio_output(&self, unit: UnitId) -> u8 {
        self.shadow_output(unit)
    }
}
