//! Reset unit facade and the startup handshake.
//!
//! Unit 0 is shared by both directions: the host resets the pack by
//! sending 0xFF to it, and the pack notifies the host with 0xFF on the
//! same unit whenever it was reset itself. A handler that blindly resets
//! the host on that notification, combined with a host that resets the
//! pack at startup, retriggers forever. [`ExtPack::startup_handshake`]
//! encodes the convention that avoids the loop.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use extpack_protocol::{AccessMode, UnitId, RESET_NOTIFICATION};

use crate::error::SendError;
use crate::handler::UnitHandler;
use crate::pack::ExtPack;

impl ExtPack {
    /// Command the pack to reset itself.
    pub fn reset_peer(&self) -> Result<(), SendError> {
        self.send_to(UnitId::RESET, AccessMode::Mode0, RESET_NOTIFICATION)
    }

    /// Reset the pack at startup without entering a mutual-reset loop.
    ///
    /// Silences the reset unit, resets the pack, waits out `settle` so the
    /// pack's own reset notification passes while the unit is silent, then
    /// installs `on_reset` as the live handler. From that point on a reset
    /// notification means the pack went down on its own and `on_reset`
    /// decides how the host reacts.
    pub fn startup_handshake(
        &self,
        settle: Duration,
        on_reset: Arc<dyn UnitHandler>,
    ) -> Result<(), SendError> {
        self.set_handler(UnitId::RESET, None)?;
        self.reset_peer()?;
        thread::sleep(settle);
        self.set_handler(UnitId::RESET, Some(on_reset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::handler::handler;
    use crate::transport::WireTx;
    use extpack_protocol::LineStatus;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct RecordingWire {
        bytes: Arc<Mutex<Vec<u8>>>,
    }

    impl WireTx for RecordingWire {
        fn ready(&mut self) -> bool {
            true
        }

        fn write(&mut self, byte: u8) {
            self.bytes.lock().expect("wire lock").push(byte);
        }
    }

    #[test]
    fn test_reset_peer_sends_notification_payload() {
        let wire = RecordingWire::default();
        let pack =
            ExtPack::new(DriverConfig::default(), Box::new(wire.clone())).expect("valid config");
        pack.reset_peer().expect("send succeeds");
        assert_eq!(
            wire.bytes.lock().expect("wire lock").as_slice(),
            &[0, RESET_NOTIFICATION]
        );
    }

    #[test]
    fn test_handshake_ignores_notification_inside_settle_window() {
        let pack = Arc::new(
            ExtPack::new(DriverConfig::default(), Box::new(RecordingWire::default()))
                .expect("valid config"),
        );
        let resets = Arc::new(AtomicU32::new(0));

        // Install a loud handler first; the handshake must displace it for
        // the settle window.
        let resets_clone = resets.clone();
        pack.set_handler(
            UnitId::RESET,
            Some(handler(move |_, _| {
                resets_clone.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("in range");

        let handshake_pack = pack.clone();
        let resets_after = resets.clone();
        let worker = thread::spawn(move || {
            handshake_pack.startup_handshake(
                Duration::from_millis(50),
                handler(move |_, _| {
                    resets_after.fetch_add(1, Ordering::SeqCst);
                }),
            )
        });

        // The pack's answering reset pulse arrives inside the window.
        thread::sleep(Duration::from_millis(10));
        pack.feed_wire_byte(UnitId::RESET.raw(), LineStatus::CLEAN);
        pack.feed_wire_byte(RESET_NOTIFICATION, LineStatus::CLEAN);
        assert_eq!(resets.load(Ordering::SeqCst), 0);

        worker
            .join()
            .expect("handshake thread")
            .expect("handshake sends succeed");

        // After the window the live handler reacts again.
        pack.feed_wire_byte(UnitId::RESET.raw(), LineStatus::CLEAN);
        pack.feed_wire_byte(RESET_NOTIFICATION, LineStatus::CLEAN);
        assert_eq!(resets.load(Ordering::SeqCst), 1);
    }
}
