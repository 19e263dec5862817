//! Receive framing state machine.
//!
//! The link has no frame markers, so pair alignment on the receive side is
//! maintained by a three-state machine plus an external guard timer. The
//! decoder consumes one byte at a time together with the line status the
//! UART reported for that byte, and tells its caller when to arm or disarm
//! the guard timer. When the timer fires, the caller invokes
//! [`PairDecoder::force_resync`] to drop the half-received pair and realign
//! on the next byte.

use log::trace;

use crate::types::CommandPair;

// ============================================================================
// Line status
// ============================================================================

/// Receive status flags the UART hardware reports alongside each byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineStatus {
    /// A stop-bit (framing) error was detected for this byte.
    pub frame_error: bool,
    /// A parity error was detected for this byte.
    pub parity_error: bool,
}

impl LineStatus {
    /// Status of a byte received without errors.
    pub const CLEAN: LineStatus = LineStatus {
        frame_error: false,
        parity_error: false,
    };

    /// True if any error flag is set.
    pub fn has_error(&self) -> bool {
        self.frame_error || self.parity_error
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// State of the receive framing machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// The next byte is the unit byte of a new pair.
    AwaitUnit,
    /// The unit byte was received cleanly; the next byte is the payload.
    AwaitData,
    /// The unit byte arrived with a line error; the next byte is consumed
    /// to keep pair alignment but the pair is discarded.
    InvalidUnit,
}

/// Guard timer instruction emitted with each decode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardAction {
    /// (Re)arm the guard timer: a pair is now half received.
    Arm,
    /// Disarm the guard timer: the pair completed or was discarded.
    Disarm,
    /// Leave the guard timer as it is.
    Keep,
}

/// Result of feeding one byte into the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStep {
    /// A completed command pair, if this byte finished one cleanly.
    pub pair: Option<CommandPair>,
    /// What the caller should do with the guard timer.
    pub guard: GuardAction,
}

/// Reassembles command pairs from the raw receive byte stream.
#[derive(Debug)]
pub struct PairDecoder {
    state: DecoderState,
    pending_unit_byte: u8,
}

impl Default for PairDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PairDecoder {
    /// Create a decoder aligned on a pair boundary.
    pub fn new() -> Self {
        PairDecoder {
            state: DecoderState::AwaitUnit,
            pending_unit_byte: 0,
        }
    }

    /// The current state, mainly useful for the guard-timer logic and tests.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// True while a pair is half received and the guard timer should be
    /// running.
    pub fn is_mid_pair(&self) -> bool {
        self.state != DecoderState::AwaitUnit
    }

    /// Feed one received byte and its line status into the state machine.
    pub fn push(&mut self, byte: u8, status: LineStatus) -> DecodeStep {
        match self.state {
            DecoderState::AwaitUnit => {
                self.pending_unit_byte = byte;
                self.state = if status.has_error() {
                    trace!("unit byte 0x{:02X} had a line error, pair will be dropped", byte);
                    DecoderState::InvalidUnit
                } else {
                    DecoderState::AwaitData
                };
                // Either way a pair is now in flight and must not be able to
                // wedge the machine.
                DecodeStep {
                    pair: None,
                    guard: GuardAction::Arm,
                }
            }
            DecoderState::AwaitData => {
                if status.has_error() {
                    // The guard timer stays armed and owns recovery: a later
                    // clean byte completes the pair, the timeout realigns.
                    trace!("data byte had a line error, waiting for guard timer");
                    return DecodeStep {
                        pair: None,
                        guard: GuardAction::Keep,
                    };
                }
                self.state = DecoderState::AwaitUnit;
                DecodeStep {
                    pair: Some(CommandPair::from_raw(self.pending_unit_byte, byte)),
                    guard: GuardAction::Disarm,
                }
            }
            DecoderState::InvalidUnit => {
                // Second byte of an errored pair: consumed for alignment,
                // never delivered.
                self.state = DecoderState::AwaitUnit;
                DecodeStep {
                    pair: None,
                    guard: GuardAction::Disarm,
                }
            }
        }
    }

    /// Guard timer expiry: drop the half-received pair and realign on the
    /// next byte. Idempotent when already aligned.
    pub fn force_resync(&mut self) {
        if self.state != DecoderState::AwaitUnit {
            trace!("guard timer expired mid-pair, resynchronizing");
            self.state = DecoderState::AwaitUnit;
        }
    }
}
