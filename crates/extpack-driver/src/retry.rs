//! Bounded-retry send helpers.
//!
//! The engine itself never retries: a `NotReady` send simply fails and the
//! give-up policy belongs to the caller. These helpers implement the common
//! policy (retry with a fixed delay up to an attempt budget) without
//! taking that decision away (an attempt budget of 0 retries forever; use
//! it only where the link is known good).

use std::thread;
use std::time::Duration;

use crate::error::SendError;
use crate::pack::ExtPack;

impl ExtPack {
    /// Send a pair, retrying `NotReady` failures with a fixed delay.
    ///
    /// `max_attempts` is the total number of tries; 0 means unlimited.
    /// Invalid-unit failures are never retried.
    pub fn send_with_retry(
        &self,
        unit_byte: u8,
        data: u8,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<(), SendError> {
        let mut attempts = 0u32;
        loop {
            match self.send(unit_byte, data) {
                Ok(()) => return Ok(()),
                Err(SendError::NotReady) => {
                    attempts += 1;
                    if max_attempts != 0 && attempts >= max_attempts {
                        return Err(SendError::NotReady);
                    }
                    thread::sleep(retry_delay);
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Send a run of bytes to one unit byte, pacing them `byte_delay`
    /// apart and retrying each byte like
    /// [`send_with_retry`](Self::send_with_retry).
    ///
    /// Stops at the first byte that exhausts its attempts; bytes already
    /// sent stay sent (no partial-send recovery).
    pub fn send_string(
        &self,
        unit_byte: u8,
        data: &[u8],
        byte_delay: Duration,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<(), SendError> {
        for (index, &byte) in data.iter().enumerate() {
            if index > 0 {
                thread::sleep(byte_delay);
            }
            self.send_with_retry(unit_byte, byte, max_attempts, retry_delay)?;
        }
        Ok(())
    }
}
