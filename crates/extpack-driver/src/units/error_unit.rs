//! Error unit facade.
//!
//! The pack reports its own link and processing problems as a bitmask on
//! the reserved error unit. Register a handler on
//! [`UnitId::ERROR`](extpack_protocol::UnitId::ERROR) to react immediately,
//! or poll the cached value here.

use extpack_protocol::{PeerError, UnitId};

use crate::pack::ExtPack;

impl ExtPack {
    /// The most recent error report from the pack. Pure cache read; a
    /// clear result means no error has been reported since startup.
    pub fn last_peer_error(&self) -> PeerError {
        PeerError::from_raw(self.shadow_input(UnitId::ERROR))
    }
}
