//! The ExtPack context: unit table, shadow storage, and dispatch.
//!
//! [`ExtPack`] is the one component that knows what a unit number means. It
//! owns the dispatch table (unit kind + handler per unit), the per-unit
//! shadow of the last byte sent and received, the event mask, and both
//! protocol engines. All of that sits behind a single engine lock, the
//! hosted equivalent of the short interrupt-disabled sections the bare-metal
//! driver uses, and every context method holds the lock only for a short,
//! bounded section.

use std::sync::Arc;

use log::trace;
use parking_lot::Mutex;

use extpack_protocol::{
    encode_unit_byte, AccessMode, CommandPair, GuardAction, LineStatus, PairDecoder, UnitId,
};

use crate::config::DriverConfig;
use crate::error::{ConfigError, SendError};
use crate::events::EventMask;
use crate::handler::UnitHandler;
use crate::transport::{TxEngine, WireTx};

// ============================================================================
// Unit table
// ============================================================================

/// Kind of peripheral behind a unit number.
///
/// The kind steers the shadow-output side effect on send and gates receive
/// dispatch: pairs addressed to an [`UnitKind::Undefined`] unit are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitKind {
    /// No unit registered; inbound data for it is discarded.
    #[default]
    Undefined,
    /// The reserved reset unit.
    Reset,
    /// The reserved error unit.
    Error,
    /// The reserved acknowledge unit.
    Ack,
    /// General purpose I/O pins.
    Gpio,
    /// UART passthrough.
    Uart,
    /// Hardware timer.
    Timer,
    /// SPI master.
    Spi,
    /// I2C master.
    I2c,
    /// External SRAM.
    Sram,
}

struct UnitEntry {
    kind: UnitKind,
    handler: Option<Arc<dyn UnitHandler>>,
}

/// Last-known I/O bytes of one unit.
#[derive(Debug, Clone, Copy, Default)]
struct Shadow {
    last_input: u8,
    last_output: u8,
}

// ============================================================================
// Engine state
// ============================================================================

struct EngineState {
    units: Vec<UnitEntry>,
    shadow: Vec<Shadow>,
    events: EventMask,
    tx: TxEngine,
    rx: PairDecoder,
}

/// A handler delivery collected under the lock, invoked after release.
type Delivery = (Arc<dyn UnitHandler>, UnitId, u8);

impl EngineState {
    fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Decode-complete path: update shadow state and events, pick out the
    /// handler to run. Runs under the engine lock.
    fn process_received(&mut self, pair: CommandPair) -> Option<Delivery> {
        let unit = pair.unit();
        if unit.index() >= self.unit_count() {
            trace!("dropping pair for out-of-range unit {}", unit);
            return None;
        }
        if !pair.mode().is_primary() {
            // Nonzero access-mode bits inbound are configuration echoes,
            // not application data.
            trace!("dropping configuration echo for {}", unit);
            return None;
        }
        let entry = &self.units[unit.index()];
        if entry.kind == UnitKind::Undefined {
            trace!("dropping pair for undefined unit {}", unit);
            return None;
        }
        self.shadow[unit.index()].last_input = pair.data;
        self.events.set(unit);
        entry
            .handler
            .clone()
            .map(|handler| (handler, unit, pair.data))
    }
}

// ============================================================================
// Context
// ============================================================================

/// One ExtPack instance: the authoritative dispatch table and shadow state
/// for a single UART link.
///
/// The context is `Send + Sync`; wrap it in an [`Arc`] and share it between
/// application threads and the [`Driver`](crate::Driver) dispatch thread.
pub struct ExtPack {
    config: DriverConfig,
    state: Mutex<EngineState>,
}

impl ExtPack {
    /// Create a context speaking through the given wire.
    ///
    /// The reserved units 0–2 (reset, error, acknowledge) are registered
    /// with their kinds and no handler; everything else starts undefined.
    pub fn new(config: DriverConfig, wire: Box<dyn WireTx>) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut units: Vec<UnitEntry> = (0..config.unit_count)
            .map(|_| UnitEntry {
                kind: UnitKind::Undefined,
                handler: None,
            })
            .collect();
        for (reserved, kind) in [
            (UnitId::RESET, UnitKind::Reset),
            (UnitId::ERROR, UnitKind::Error),
            (UnitId::ACK, UnitKind::Ack),
        ] {
            if let Some(entry) = units.get_mut(reserved.index()) {
                entry.kind = kind;
            }
        }
        let tx = TxEngine::new(wire, config.tx_queue_capacity);
        Ok(ExtPack {
            state: Mutex::new(EngineState {
                shadow: vec![Shadow::default(); config.unit_count],
                units,
                events: EventMask::new(),
                tx,
                rx: PairDecoder::new(),
            }),
            config,
        })
    }

    /// The configuration the context was built with.
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Unit table
    // ------------------------------------------------------------------

    /// Register a unit, overwriting any previous registration.
    pub fn register_unit(
        &self,
        unit: UnitId,
        kind: UnitKind,
        handler: Option<Arc<dyn UnitHandler>>,
    ) -> Result<(), SendError> {
        let mut state = self.state.lock();
        let entry = state
            .units
            .get_mut(unit.index())
            .ok_or(SendError::InvalidUnit(unit.raw()))?;
        entry.kind = kind;
        entry.handler = handler;
        Ok(())
    }

    /// Replace only the handler of a unit, leaving its kind untouched.
    ///
    /// Passing `None` silences the unit; inbound data still updates the
    /// shadow and event state. This is the documented way to hold off a
    /// unit during the reset handshake.
    pub fn set_handler(
        &self,
        unit: UnitId,
        handler: Option<Arc<dyn UnitHandler>>,
    ) -> Result<(), SendError> {
        let mut state = self.state.lock();
        let entry = state
            .units
            .get_mut(unit.index())
            .ok_or(SendError::InvalidUnit(unit.raw()))?;
        entry.handler = handler;
        Ok(())
    }

    /// The registered kind of a unit.
    pub fn unit_kind(&self, unit: UnitId) -> UnitKind {
        self.state
            .lock()
            .units
            .get(unit.index())
            .map_or(UnitKind::Undefined, |entry| entry.kind)
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    /// Send a command pair. The unit byte may carry access-mode bits.
    ///
    /// This is the single chokepoint for outbound range checking: the unit
    /// number must be below the configured unit count or the call fails
    /// without any wire traffic. A successful send of a "set current value"
    /// command additionally updates the unit's shadow output byte: a
    /// best-effort record of what was attempted, not a peer confirmation.
    pub fn send(&self, unit_byte: u8, data: u8) -> Result<(), SendError> {
        let unit = UnitId::from_unit_byte(unit_byte);
        if unit.index() >= self.config.unit_count {
            return Err(SendError::InvalidUnit(unit.raw()));
        }
        let mode = AccessMode::from_unit_byte(unit_byte);
        let mut state = self.state.lock();
        state.tx.send(CommandPair::from_raw(unit_byte, data))?;
        let shadow_output = match (state.units[unit.index()].kind, mode) {
            // GPIO output register, written in the primary mode.
            (UnitKind::Gpio, AccessMode::Mode0) => Some(data),
            // SPI slave id and I2C partner address, written in mode 1.
            (UnitKind::Spi, AccessMode::Mode1) => Some(data),
            (UnitKind::I2c, AccessMode::Mode1) => Some(data),
            // ACK unit: remember the commanded enable state.
            (UnitKind::Ack, _) => Some((data != 0) as u8),
            _ => None,
        };
        if let Some(value) = shadow_output {
            state.shadow[unit.index()].last_output = value;
        }
        Ok(())
    }

    /// Send to a unit with an explicit access mode.
    pub fn send_to(&self, unit: UnitId, mode: AccessMode, data: u8) -> Result<(), SendError> {
        self.send(encode_unit_byte(unit, mode), data)
    }

    // ------------------------------------------------------------------
    // Shadow state
    // ------------------------------------------------------------------

    /// Last byte received from the unit. Pure cache read, no wire traffic.
    pub fn shadow_input(&self, unit: UnitId) -> u8 {
        self.state
            .lock()
            .shadow
            .get(unit.index())
            .map_or(0, |shadow| shadow.last_input)
    }

    /// Last byte sent to the unit's current-value register. Pure cache
    /// read, no wire traffic.
    pub fn shadow_output(&self, unit: UnitId) -> u8 {
        self.state
            .lock()
            .shadow
            .get(unit.index())
            .map_or(0, |shadow| shadow.last_output)
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Peek at a unit's event bit without clearing it.
    pub fn event(&self, unit: UnitId) -> bool {
        self.state.lock().events.get(unit)
    }

    /// Set a unit's event bit.
    pub fn set_event(&self, unit: UnitId) {
        self.state.lock().events.set(unit);
    }

    /// Clear a unit's event bit.
    pub fn clear_event(&self, unit: UnitId) {
        self.state.lock().events.clear(unit);
    }

    /// Read and clear a unit's event bit in one atomic step.
    pub fn take_event(&self, unit: UnitId) -> bool {
        self.state.lock().events.take(unit)
    }

    /// Clear every unit's event bit.
    pub fn reset_events(&self) {
        self.state.lock().events.reset();
    }

    // ------------------------------------------------------------------
    // Wire-facing path (called by the driver loop or a custom backend)
    // ------------------------------------------------------------------

    /// Feed one received byte through the framing state machine, updating
    /// shadow and event state and invoking the unit handler when a pair
    /// completes.
    ///
    /// Must be called from a single thread; the handler runs on the calling
    /// thread after the engine lock has been released. The returned action
    /// tells the caller how to manage the receive guard timer.
    pub fn feed_wire_byte(&self, byte: u8, status: LineStatus) -> GuardAction {
        let (guard, delivery) = {
            let mut state = self.state.lock();
            let step = state.rx.push(byte, status);
            let delivery = step.pair.and_then(|pair| state.process_received(pair));
            (step.guard, delivery)
        };
        if let Some((handler, unit, data)) = delivery {
            handler.on_receive(unit, data);
        }
        guard
    }

    /// Guard timer expiry: realign the framing state machine on the next
    /// pair boundary.
    pub fn handle_guard_timeout(&self) {
        self.state.lock().rx.force_resync();
    }

    /// True while a pair is half received (the guard timer should run).
    pub fn is_mid_pair(&self) -> bool {
        self.state.lock().rx.is_mid_pair()
    }

    /// Transmit-register-empty path: let the transmit engine push out any
    /// bytes the wire will now take.
    pub fn service_tx(&self) {
        self.state.lock().tx.service();
    }

    /// True when nothing is queued or in flight on the transmit side.
    pub fn tx_idle(&self) -> bool {
        self.state.lock().tx.idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Unbounded recording wire.
    #[derive(Clone, Default)]
    struct RecordingWire {
        bytes: Arc<StdMutex<Vec<u8>>>,
    }

    impl RecordingWire {
        fn written(&self) -> Vec<u8> {
            self.bytes.lock().expect("wire lock").clone()
        }
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

    fn pack_with_wire(config: DriverConfig) -> (Arc<ExtPack>, RecordingWire) {
        let wire = RecordingWire::default();
        let pack = ExtPack::new(config, Box::new(wire.clone())).expect("valid config");
        (Arc::new(pack), wire)
    }

    fn feed_pair(pack: &ExtPack, unit_byte: u8, data: u8) {
        pack.feed_wire_byte(unit_byte, LineStatus::CLEAN);
        pack.feed_wire_byte(data, LineStatus::CLEAN);
    }

    #[test]
    fn test_reserved_units_preregistered() {
        let (pack, _) = pack_with_wire(DriverConfig::default());
        assert_eq!(pack.unit_kind(UnitId::RESET), UnitKind::Reset);
        assert_eq!(pack.unit_kind(UnitId::ERROR), UnitKind::Error);
        assert_eq!(pack.unit_kind(UnitId::ACK), UnitKind::Ack);
        assert_eq!(pack.unit_kind(unit(3)), UnitKind::Undefined);
    }

    #[test]
    fn test_receive_dispatch_updates_shadow_event_and_handler() {
        let (pack, _) = pack_with_wire(DriverConfig::default());
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        pack.register_unit(
            unit(5),
            UnitKind::Uart,
            Some(handler(move |u, data| {
                assert_eq!(u, UnitId::new(5).expect("in range"));
                assert_eq!(data, 0x42);
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .expect("in range");

        feed_pair(&pack, 5, 0x42);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(pack.shadow_input(unit(5)), 0x42);
        assert!(pack.event(unit(5)));
        assert!(!pack.is_mid_pair());
    }

    #[test]
    fn test_unregistered_unit_is_ignored() {
        let (pack, _) = pack_with_wire(DriverConfig::default());
        feed_pair(&pack, 9, 0x55);
        assert_eq!(pack.shadow_input(unit(9)), 0);
        assert!(!pack.event(unit(9)));
    }

    #[test]
    fn test_inbound_config_echo_is_ignored() {
        let (pack, _) = pack_with_wire(DriverConfig::default());
        pack.register_unit(unit(5), UnitKind::Gpio, None)
            .expect("in range");

        // Same unit, but with access-mode bits set: a configuration echo.
        let echo_byte = encode_unit_byte(unit(5), AccessMode::Mode2);
        feed_pair(&pack, echo_byte, 0x77);

        assert_eq!(pack.shadow_input(unit(5)), 0);
        assert!(!pack.event(unit(5)));
    }

    #[test]
    fn test_out_of_range_unit_is_ignored() {
        let mut config = DriverConfig::default();
        config.unit_count = 4;
        let (pack, _) = pack_with_wire(config);

        feed_pair(&pack, 10, 0x11);
        assert!(!pack.event(unit(10)));
    }

    #[test]
    fn test_send_range_check_blocks_wire_traffic() {
        let mut config = DriverConfig::default();
        config.unit_count = 4;
        let (pack, wire) = pack_with_wire(config);

        assert_eq!(pack.send(7, 0x01), Err(SendError::InvalidUnit(7)));
        assert_eq!(wire.written(), Vec::<u8>::new());
    }

    #[test]
    fn test_gpio_send_shadows_output_without_wire_read() {
        let (pack, wire) = pack_with_wire(DriverConfig::default());
        pack.register_unit(unit(4), UnitKind::Gpio, None)
            .expect("in range");

        pack.send_to(unit(4), AccessMode::Mode0, 0b10)
            .expect("send succeeds");

        assert_eq!(pack.shadow_output(unit(4)), 0b10);
        // Exactly the outbound pair went over the wire; the shadow read
        // itself produced no traffic.
        assert_eq!(wire.written(), vec![4, 0b10]);
    }

    #[test]
    fn test_gpio_refresh_request_does_not_shadow_output() {
        let (pack, _) = pack_with_wire(DriverConfig::default());
        pack.register_unit(unit(4), UnitKind::Gpio, None)
            .expect("in range");

        pack.send_to(unit(4), AccessMode::Mode0, 0xF0)
            .expect("send succeeds");
        pack.send_to(unit(4), AccessMode::Mode1, 0x00)
            .expect("send succeeds");

        assert_eq!(pack.shadow_output(unit(4)), 0xF0);
    }

    #[test]
    fn test_spi_and_i2c_shadow_their_mode1_addresses() {
        let (pack, _) = pack_with_wire(DriverConfig::default());
        pack.register_unit(unit(6), UnitKind::Spi, None)
            .expect("in range");
        pack.register_unit(unit(7), UnitKind::I2c, None)
            .expect("in range");

        pack.send_to(unit(6), AccessMode::Mode1, 0x03)
            .expect("send succeeds");
        pack.send_to(unit(7), AccessMode::Mode1, 0x50)
            .expect("send succeeds");
        // Plain data sends must not disturb the shadowed addresses.
        pack.send_to(unit(6), AccessMode::Mode0, 0xEE)
            .expect("send succeeds");
        pack.send_to(unit(7), AccessMode::Mode0, 0xEE)
            .expect("send succeeds");

        assert_eq!(pack.shadow_output(unit(6)), 0x03);
        assert_eq!(pack.shadow_output(unit(7)), 0x50);
    }

    #[test]
    fn test_handler_may_send_from_dispatch() {
        let (pack, wire) = pack_with_wire(DriverConfig::default());
        let echo_pack = Arc::downgrade(&pack);
        pack.register_unit(
            unit(3),
            UnitKind::Uart,
            Some(handler(move |u, data| {
                if let Some(pack) = echo_pack.upgrade() {
                    pack.send(u.raw(), data).expect("echo send succeeds");
                }
            })),
        )
        .expect("in range");

        feed_pair(&pack, 3, b'A');

        // The handler ran and produced the echo pair on the wire.
        assert_eq!(wire.written(), vec![3, b'A']);
    }

    #[test]
    fn test_set_handler_none_silences_but_still_records() {
        let (pack, _) = pack_with_wire(DriverConfig::default());
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

        pack.set_handler(unit(5), None).expect("in range");
        feed_pair(&pack, 5, 0x10);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // Silenced, not deregistered: shadow and event state still track.
        assert_eq!(pack.shadow_input(unit(5)), 0x10);
        assert!(pack.take_event(unit(5)));
    }
}
