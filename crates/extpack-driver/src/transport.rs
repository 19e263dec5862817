//! Transmit path: hardware seam and pair-at-a-time pump.
//!
//! The engine talks to the outgoing wire through [`WireTx`], a minimal
//! model of a UART transmit register: it is either ready to accept one
//! byte or it is not. [`TxEngine`] layers the command-pair discipline on
//! top: the two bytes of a pair always leave back to back, a queued pair
//! never overtakes an earlier one, and when no queue is configured a
//! second send while a pair is in flight fails retryably instead of
//! reordering.

use log::warn;

use extpack_protocol::CommandPair;

use crate::error::SendError;
use crate::ring::RingBuffer;

// ============================================================================
// Hardware seam
// ============================================================================

/// The transmit side of the wire, modeled as a one-byte register.
pub trait WireTx: Send {
    /// True when the register can accept the next byte.
    fn ready(&mut self) -> bool;

    /// Hand one byte to the register. Only valid after `ready()` returned
    /// true.
    fn write(&mut self, byte: u8);
}

/// [`WireTx`] adapter over any byte sink.
///
/// A hosted stream has no occupied-register state, so the adapter is always
/// ready; backpressure shows up as blocking inside `write` instead. Write
/// failures cannot be propagated out of the register model and are logged.
pub struct IoWire<W: std::io::Write + Send> {
    inner: W,
}

impl<W: std::io::Write + Send> IoWire<W> {
    /// Wrap a byte sink.
    pub fn new(inner: W) -> Self {
        IoWire { inner }
    }
}

impl<W: std::io::Write + Send> WireTx for IoWire<W> {
    fn ready(&mut self) -> bool {
        true
    }

    fn write(&mut self, byte: u8) {
        if let Err(e) = self.inner.write_all(&[byte]).and_then(|_| self.inner.flush()) {
            warn!("wire write failed: {}", e);
        }
    }
}

// ============================================================================
// Transmit engine
// ============================================================================

/// Owns the outgoing wire and enforces the command-pair discipline.
///
/// Lives inside the engine lock; every method requires the caller to
/// already hold it.
pub(crate) struct TxEngine {
    wire: Box<dyn WireTx>,
    /// Software queue of pending pairs; `None` in direct mode.
    queue: Option<RingBuffer>,
    /// Data byte of the pair whose unit byte is already on the wire.
    in_flight: Option<u8>,
}

impl TxEngine {
    /// Create an engine. A queue capacity of 0 selects direct mode.
    pub(crate) fn new(wire: Box<dyn WireTx>, queue_capacity: usize) -> Self {
        TxEngine {
            wire,
            queue: (queue_capacity > 0).then(|| RingBuffer::new(queue_capacity)),
            in_flight: None,
        }
    }

    /// True when nothing is queued or in flight.
    pub(crate) fn idle(&self) -> bool {
        self.in_flight.is_none() && self.queue.as_ref().map_or(true, |q| q.is_empty())
    }

    /// Accept a pair for transmission.
    pub(crate) fn send(&mut self, pair: CommandPair) -> Result<(), SendError> {
        match &mut self.queue {
            Some(queue) => {
                queue.write(pair.to_word()).map_err(|_| SendError::NotReady)?;
            }
            None => {
                if self.in_flight.is_some() || !self.wire.ready() {
                    return Err(SendError::NotReady);
                }
                self.wire.write(pair.unit_byte);
                self.in_flight = Some(pair.data);
            }
        }
        self.service();
        Ok(())
    }

    /// The transmit-register-empty path: push out as many bytes as the wire
    /// will take, always finishing the in-flight pair's data byte before
    /// starting the next pair.
    pub(crate) fn service(&mut self) {
        while self.wire.ready() {
            if let Some(data) = self.in_flight.take() {
                self.wire.write(data);
                continue;
            }
            let next = self.queue.as_mut().and_then(|q| q.read().ok());
            match next {
                Some(word) => {
                    let pair = CommandPair::from_word(word);
                    self.wire.write(pair.unit_byte);
                    self.in_flight = Some(pair.data);
                }
                None => break,
            }
        }
    }
}
