//! Driver configuration.

use std::time::Duration;

use extpack_protocol::{guard_timeout, BAUD_RATE, MAX_UNITS};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Build-time configuration of the driver engine.
///
/// The defaults mirror the shipping ExtPack bitstream: all 64 units
/// addressable, a 10-pair transmit queue, 1 MBaud.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Number of units the engine allocates dispatch and shadow state for.
    ///
    /// Commands addressed to units at or above this count are rejected on
    /// send and silently dropped on receive.
    pub unit_count: usize,

    /// Capacity of the transmit ring buffer in command pairs.
    ///
    /// A capacity of 0 disables buffering entirely: `send` then only
    /// succeeds while no other pair is in flight and fails retryably
    /// otherwise (direct mode).
    pub tx_queue_capacity: usize,

    /// UART bit rate of the link. Used to size the receive guard timeout;
    /// the driver does not configure the port itself, so open it at this
    /// rate (8 data bits, no parity, 1 stop bit).
    pub baud_rate: u32,

    /// Sleep granularity of the acknowledge busy-wait loops.
    pub ack_poll_tick: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            unit_count: MAX_UNITS,
            tx_queue_capacity: 10,
            baud_rate: BAUD_RATE,
            ack_poll_tick: Duration::from_micros(1),
        }
    }
}

impl DriverConfig {
    /// Check the configuration for values the engine cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.unit_count == 0 || self.unit_count > MAX_UNITS {
            return Err(ConfigError::UnitCountOutOfRange(self.unit_count));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::InvalidBaudRate);
        }
        Ok(())
    }

    /// The receive guard timeout for this link rate.
    pub fn guard_timeout(&self) -> Duration {
        guard_timeout(self.baud_rate)
    }

    /// True when the transmit path runs without a software queue.
    pub fn is_direct_mode(&self) -> bool {
        self.tx_queue_capacity == 0
    }
}
