//! # extpack-driver
//!
//! Host-side driver engine for the ExtPack extension pack: a companion FPGA
//! peripheral exposing up to 64 virtual I/O units (GPIO, UART passthrough,
//! timers, SPI, I2C, SRAM) over a single fixed-rate UART link.
//!
//! The driver multiplexes 2-byte command pairs onto the wire and
//! demultiplexes the inbound stream back into per-unit deliveries. It keeps
//! a shadow copy of the last byte sent to and received from every unit, a
//! 64-bit event mask of units with unconsumed input, and a synchronous
//! acknowledge layer on top of the reserved ACK unit.
//!
//! ## Architecture
//!
//! On the original bare-metal target the receive path runs in interrupt
//! context. This hosted driver replaces interrupt handlers with a dedicated
//! dispatch thread: a wire reader feeds received bytes through a channel
//! into the engine loop, which runs the framing state machine, applies the
//! guard timeout, and invokes unit handlers one at a time. Mutual exclusion
//! between application threads and the dispatch path is a single engine
//! lock instead of a global interrupt disable; the lock is only ever held
//! for short, bounded sections.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use extpack_driver::{handler, Driver, DriverConfig, ExtPack, IoWire, UnitKind};
//! use extpack_protocol::UnitId;
//!
//! let port = serial_open()?; // any Read + Write byte stream
//! let pack = Arc::new(ExtPack::new(
//!     DriverConfig::default(),
//!     Box::new(IoWire::new(port.try_clone()?)),
//! )?);
//! let uart = UnitId::new(3)?;
//! pack.register_unit(uart, UnitKind::Uart, Some(handler(|_, byte| {
//!     println!("got 0x{:02X}", byte);
//! })));
//! let driver = Driver::spawn(pack.clone(), port);
//! pack.send_uart_byte(uart, b'A')?;
//! ```

mod ack;
mod config;
mod error;
mod events;
mod handler;
mod io;
mod pack;
mod retry;
mod ring;
mod transport;
mod units;

pub use ack::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use handler::*;
pub use io::*;
pub use pack::*;
pub use ring::*;
pub use transport::*;
pub use units::*;
