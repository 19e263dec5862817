//! Per-unit receive handlers.

use std::sync::Arc;

use extpack_protocol::UnitId;

/// Callback invoked when a command pair addressed to a unit completes.
///
/// Handlers run on the dispatch thread, one delivery at a time, after the
/// engine lock has been released. A handler may therefore call back into
/// the driver (sending from a handler is the normal way to build echo or
/// request/response behavior), but it delays every later delivery for as
/// long as it runs. Keep handlers short, and never block one on an
/// acknowledge wait, since the acknowledgment could only be delivered by
/// the thread that is waiting.
pub trait UnitHandler: Send + Sync {
    /// Called with the addressed unit and the received data byte.
    fn on_receive(&self, unit: UnitId, data: u8);
}

impl<F> UnitHandler for F
where
    F: Fn(UnitId, u8) + Send + Sync,
{
    fn on_receive(&self, unit: UnitId, data: u8) {
        self(unit, data)
    }
}

/// Wrap a closure as a shareable unit handler.
pub fn handler<F>(f: F) -> Arc<dyn UnitHandler>
where
    F: Fn(UnitId, u8) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_closure_handler_receives_arguments() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_clone = seen.clone();
        let h = handler(move |unit, data| {
            seen_clone.store(((unit.raw() as u32) << 8) | data as u32, Ordering::SeqCst);
        });
        h.on_receive(UnitId::new(5).expect("in range"), 0x42);
        assert_eq!(seen.load(Ordering::SeqCst), 0x0542);
    }
}
