//! Synchronous acknowledge layer.
//!
//! Sends over the link are fire and forget. For operations that must be
//! verifiable, the pack can be told to confirm them on the reserved ACK
//! unit; this layer turns that confirmation into a blocking wait. The idiom
//! is: clear the ACK event, issue the operation, then wait with a bounded
//! timeout for the event the acknowledgment sets.
//!
//! The ACK event is a single-bit, single-consumer signal. Only one waiter
//! may be outstanding at a time; concurrent waiters race to consume the
//! bit. The protocol carries no sequence numbers, so a late acknowledgment
//! of an earlier operation is indistinguishable from a wrong-data
//! acknowledgment of the current one; integrators who need stronger
//! correlation must build it into the acknowledged payloads.

use std::thread;
use std::time::{Duration, Instant};

use extpack_protocol::{AccessMode, UnitId};

use crate::error::{AckError, SendError};
use crate::pack::ExtPack;

impl ExtPack {
    /// Peek at the ACK event without consuming it.
    pub fn ack_event(&self) -> bool {
        self.event(UnitId::ACK)
    }

    /// Clear the ACK event, typically right before issuing an operation
    /// that will be acknowledged.
    pub fn clear_ack_event(&self) {
        self.clear_event(UnitId::ACK);
    }

    /// The data byte of the most recent acknowledgment.
    pub fn last_ack_data(&self) -> u8 {
        self.shadow_input(UnitId::ACK)
    }

    /// Command the pack to enable or disable acknowledgments.
    pub fn set_ack_enabled(&self, enabled: bool) -> Result<(), SendError> {
        self.send_to(UnitId::ACK, AccessMode::Mode0, enabled as u8)
    }

    /// The last commanded acknowledge state. Best-effort shadow of what was
    /// sent, not a peer confirmation.
    pub fn ack_enabled(&self) -> bool {
        self.shadow_output(UnitId::ACK) != 0
    }

    /// Block until an acknowledgment arrives or the timeout elapses.
    ///
    /// Consumes the ACK event. Returns within roughly one poll tick of the
    /// event being set; on timeout the total wait is bounded by the timeout
    /// plus one poll tick.
    pub fn wait_for_ack(&self, timeout: Duration) -> Result<(), AckError> {
        self.wait_ack_inner(timeout).map(|_| ())
    }

    /// Like [`wait_for_ack`](Self::wait_for_ack), but additionally checks
    /// the acknowledgment payload against the expected byte.
    pub fn wait_for_ack_data(&self, expected: u8, timeout: Duration) -> Result<(), AckError> {
        let received = self.wait_ack_inner(timeout)?;
        if received == expected {
            Ok(())
        } else {
            Err(AckError::Mismatch { expected, received })
        }
    }

    fn wait_ack_inner(&self, timeout: Duration) -> Result<u8, AckError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.take_event(UnitId::ACK) {
                return Ok(self.last_ack_data());
            }
            if Instant::now() >= deadline {
                return Err(AckError::Timeout);
            }
            thread::sleep(self.config().ack_poll_tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::pack::UnitKind;
    use crate::transport::WireTx;
    use extpack_protocol::LineStatus;
    use std::sync::Arc;

    struct NullWire;

    impl WireTx for NullWire {
        fn ready(&mut self) -> bool {
            true
        }

        fn write(&mut self, _byte: u8) {}
    }

    fn pack() -> Arc<ExtPack> {
        Arc::new(ExtPack::new(DriverConfig::default(), Box::new(NullWire)).expect("valid config"))
    }

    fn deliver_ack(pack: &ExtPack, data: u8) {
        pack.feed_wire_byte(UnitId::ACK.raw(), LineStatus::CLEAN);
        pack.feed_wire_byte(data, LineStatus::CLEAN);
    }

    #[test]
    fn test_pending_event_completes_immediately() {
        let pack = pack();
        deliver_ack(&pack, 0x11);

        let start = Instant::now();
        pack.wait_for_ack(Duration::from_millis(500))
            .expect("event already set");
        assert!(start.elapsed() < Duration::from_millis(500));
        // The wait consumed the event.
        assert!(!pack.ack_event());
    }

    #[test]
    fn test_wait_from_second_thread() {
        let pack = pack();
        let waiter_pack = pack.clone();
        let waiter = std::thread::spawn(move || {
            waiter_pack.wait_for_ack_data(0x2A, Duration::from_secs(2))
        });

        std::thread::sleep(Duration::from_millis(10));
        deliver_ack(&pack, 0x2A);

        waiter
            .join()
            .expect("waiter thread")
            .expect("matching ack within timeout");
    }

    #[test]
    fn test_timeout_elapses_without_event() {
        let pack = pack();
        let timeout = Duration::from_millis(20);
        let start = Instant::now();
        assert_eq!(pack.wait_for_ack(timeout), Err(AckError::Timeout));
        assert!(start.elapsed() >= timeout);
    }

    #[test]
    fn test_data_mismatch() {
        let pack = pack();
        deliver_ack(&pack, 0x10);
        assert_eq!(
            pack.wait_for_ack_data(0x20, Duration::from_millis(50)),
            Err(AckError::Mismatch {
                expected: 0x20,
                received: 0x10
            })
        );
    }

    #[test]
    fn test_enable_state_is_shadowed() {
        let pack = pack();
        assert_eq!(pack.unit_kind(UnitId::ACK), UnitKind::Ack);
        assert!(!pack.ack_enabled());
        pack.set_ack_enabled(true).expect("send succeeds");
        assert!(pack.ack_enabled());
        pack.set_ack_enabled(false).expect("send succeeds");
        assert!(!pack.ack_enabled());
    }
}
