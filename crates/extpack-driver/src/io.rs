//! Background I/O: wire reader and dispatch loop.
//!
//! On the bare-metal original the receive path is a pair of interrupt
//! handlers (receive complete, guard timer overflow) and the transmit path
//! a third (transmit register empty). Here all three become one dispatch
//! loop on its own thread, fed by a channel of received bytes:
//!
//! - a reader thread pulls bytes off the wire and pushes them into the
//!   channel,
//! - the dispatch loop pops bytes, runs the framing state machine, and
//!   invokes unit handlers one delivery at a time,
//! - while a pair is half received the loop waits with a deadline instead
//!   of blocking, and a deadline miss is the guard timer firing,
//! - between bytes the loop gives the transmit engine a chance to push out
//!   anything a previously stalled wire will now take.
//!
//! Handler invocations are strictly serialized on the dispatch thread,
//! which is what preserves the original's "callbacks run with interrupts
//! masked" ordering guarantees without any global lock being held during
//! the callback.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use extpack_protocol::{GuardAction, LineStatus};

use crate::pack::ExtPack;

/// One byte received from the wire, with the line status the UART reported
/// for it.
#[derive(Debug, Clone, Copy)]
pub struct RxByte {
    /// The received byte.
    pub byte: u8,
    /// Frame/parity status of this byte.
    pub status: LineStatus,
}

impl RxByte {
    /// A byte received without line errors.
    pub fn clean(byte: u8) -> Self {
        RxByte {
            byte,
            status: LineStatus::CLEAN,
        }
    }
}

/// Depth of the received-byte channel between reader and dispatch loop.
const RX_CHANNEL_DEPTH: usize = 256;

/// How often the dispatch loop retries the transmit engine while transmit
/// work is pending on a stalled wire.
const TX_SERVICE_TICK: Duration = Duration::from_micros(100);

/// Upper bound on any blocking wait so a shutdown request is noticed.
const SHUTDOWN_TICK: Duration = Duration::from_millis(20);

/// Running I/O for one [`ExtPack`] context.
///
/// Dropping (or explicitly shutting down) the driver stops the dispatch
/// loop. The reader thread ends when its byte source reaches end of stream
/// or errors; closing the underlying port is the application's concern.
pub struct Driver {
    injector: Sender<RxByte>,
    stop: Arc<AtomicBool>,
    dispatch: Option<JoinHandle<()>>,
}

impl Driver {
    /// Start the reader and dispatch threads for a context.
    pub fn spawn<R>(pack: Arc<ExtPack>, reader: R) -> Driver
    where
        R: Read + Send + 'static,
    {
        let (injector, rx_bytes) = bounded::<RxByte>(RX_CHANNEL_DEPTH);
        let stop = Arc::new(AtomicBool::new(false));

        // Deliberately detached: the reader ends on its own when the byte
        // source reaches end of stream or the channel closes.
        let reader_injector = injector.clone();
        let reader_stop = stop.clone();
        thread::spawn(move || reader_loop(reader, reader_injector, reader_stop));

        let dispatch_stop = stop.clone();
        let dispatch = thread::spawn(move || dispatch_loop(pack, rx_bytes, dispatch_stop));

        Driver {
            injector,
            stop,
            dispatch: Some(dispatch),
        }
    }

    /// A handle for pushing received bytes into the dispatch loop directly,
    /// bypassing the reader. Used by custom receive frontends that can
    /// report line status, and by tests to inject errored bytes.
    pub fn injector(&self) -> Sender<RxByte> {
        self.injector.clone()
    }

    /// Stop the dispatch loop and wait for it to finish.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.dispatch.take() {
            if handle.join().is_err() {
                warn!("dispatch thread panicked");
            }
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Pulls bytes off the wire and forwards them to the dispatch loop.
fn reader_loop<R: Read>(mut reader: R, injector: Sender<RxByte>, stop: Arc<AtomicBool>) {
    let mut buf = [0u8; 256];
    while !stop.load(Ordering::SeqCst) {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("wire reader reached end of stream");
                return;
            }
            Ok(n) => {
                for &byte in &buf[..n] {
                    if injector.send(RxByte::clean(byte)).is_err() {
                        return;
                    }
                }
            }
            // Serial ports configured with a read timeout surface it as an
            // error; keep polling.
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::Interrupted
                        | std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                ) =>
            {
                continue;
            }
            Err(e) => {
                warn!("wire reader stopping: {}", e);
                return;
            }
        }
    }
}

/// The hosted stand-in for the receive, guard-timer and transmit-empty
/// interrupt handlers.
fn dispatch_loop(pack: Arc<ExtPack>, rx_bytes: Receiver<RxByte>, stop: Arc<AtomicBool>) {
    let guard = pack.config().guard_timeout();
    let mut guard_deadline: Option<Instant> = None;

    while !stop.load(Ordering::SeqCst) {
        let mut wait = SHUTDOWN_TICK;
        if !pack.tx_idle() {
            wait = wait.min(TX_SERVICE_TICK);
        }
        if let Some(deadline) = guard_deadline {
            wait = wait.min(deadline.saturating_duration_since(Instant::now()));
        }

        match rx_bytes.recv_timeout(wait) {
            Ok(rx_byte) => match pack.feed_wire_byte(rx_byte.byte, rx_byte.status) {
                GuardAction::Arm => guard_deadline = Some(Instant::now() + guard),
                GuardAction::Disarm => guard_deadline = None,
                GuardAction::Keep => {}
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Some(deadline) = guard_deadline {
            if Instant::now() >= deadline {
                pack.handle_guard_timeout();
                guard_deadline = None;
            }
        }

        pack.service_tx();
    }
    debug!("dispatch loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverConfig;
    use crate::handler::handler;
    use crate::pack::UnitKind;
    use crate::transport::WireTx;
    use extpack_protocol::UnitId;
    use std::sync::atomic::AtomicU32;
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

    fn unit(n: u8) -> UnitId {
        UnitId::new(n).expect("test unit in range")
    }

    fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_injected_pair_dispatches() {
        let pack = Arc::new(
            ExtPack::new(DriverConfig::default(), Box::new(RecordingWire::default()))
                .expect("valid config"),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        pack.register_unit(
            unit(5),
            UnitKind::Uart,
            Some(handler(move |_, _| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("in range");

        let driver = Driver::spawn(pack.clone(), std::io::empty());
        let injector = driver.injector();
        injector.send(RxByte::clean(5)).expect("channel open");
        injector.send(RxByte::clean(0x42)).expect("channel open");

        wait_until("handler call", || calls.load(Ordering::SeqCst) == 1);
        assert_eq!(pack.shadow_input(unit(5)), 0x42);
        driver.shutdown();
    }

    #[test]
    fn test_guard_timeout_recovers_framing() {
        // Slow link: the guard window (66 bit periods) is ~55 ms, wide
        // enough to observe the half-received state from another thread.
        let mut config = DriverConfig::default();
        config.baud_rate = 1200;
        let pack = Arc::new(
            ExtPack::new(config, Box::new(RecordingWire::default())).expect("valid config"),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        pack.register_unit(
            unit(5),
            UnitKind::Uart,
            Some(handler(move |_, _| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("in range");

        let driver = Driver::spawn(pack.clone(), std::io::empty());
        let injector = driver.injector();

        // Only the unit byte arrives; the guard timer must resynchronize.
        injector.send(RxByte::clean(5)).expect("channel open");
        wait_until("half-received pair", || pack.is_mid_pair());
        wait_until("guard resync", || !pack.is_mid_pair());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // A subsequent clean pair is processed normally.
        injector.send(RxByte::clean(5)).expect("channel open");
        injector.send(RxByte::clean(0x42)).expect("channel open");
        wait_until("handler call", || calls.load(Ordering::SeqCst) == 1);
        driver.shutdown();
    }

    #[test]
    fn test_errored_unit_byte_yields_no_dispatch() {
        let pack = Arc::new(
            ExtPack::new(DriverConfig::default(), Box::new(RecordingWire::default()))
                .expect("valid config"),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        pack.register_unit(
            unit(5),
            UnitKind::Uart,
            Some(handler(move |_, _| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("in range");

        let driver = Driver::spawn(pack.clone(), std::io::empty());
        let injector = driver.injector();

        injector
            .send(RxByte {
                byte: 5,
                status: LineStatus {
                    frame_error: true,
                    parity_error: false,
                },
            })
            .expect("channel open");
        injector.send(RxByte::clean(0x42)).expect("channel open");

        // The errored pair vanished; a clean one still dispatches.
        injector.send(RxByte::clean(5)).expect("channel open");
        injector.send(RxByte::clean(0x43)).expect("channel open");
        wait_until("handler call", || calls.load(Ordering::SeqCst) >= 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pack.shadow_input(unit(5)), 0x43);
        driver.shutdown();
    }
}
