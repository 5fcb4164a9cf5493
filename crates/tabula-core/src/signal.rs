//! Observer plumbing for model notifications.
//!
//! A [`Signal`] owns a table of slots. Emitting calls every slot, on the
//! emitting thread, before `emit` returns. Models announce structural and
//! data changes through signals, and a proxy listens to its source the same
//! way.
//!
//! Slots run against a snapshot of the table taken when the emission starts.
//! A slot may therefore call back into the model that emitted, emit again, or
//! connect and disconnect slots; slots added mid-emission first run on the
//! next emission.
//!
//! ```
//! use tabula_core::Signal;
//!
//! let rows_changed = Signal::<usize>::new();
//! let id = rows_changed.connect(|count| println!("{count} rows"));
//! rows_changed.emit(3);
//! assert!(rows_changed.disconnect(id));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle of one connected slot, used to disconnect it.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A set of slots called with `&Args` on every emission.
///
/// Use `()` for notifications without a payload and a tuple for several
/// values.
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Adds a slot and returns its handle.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.slots.lock().insert(Arc::new(slot))
    }

    /// Adds a slot that stays connected for as long as the returned guard
    /// lives.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            id: self.connect(slot),
            signal: self,
        }
    }

    /// Removes a slot. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    pub fn disconnect_all(&self) {
        self.slots.lock().clear();
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// While blocked, [`emit`](Signal::emit) drops its argument without
    /// calling anything.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Calls every connected slot with `args`.
    #[tracing::instrument(skip_all, target = "tabula_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "blocked");
            return;
        }

        let snapshot: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = snapshot.len(), "emit");
        for slot in &snapshot {
            slot(&args);
        }
    }
}

/// Disconnects its slot when dropped.
///
/// Returned by [`Signal::connect_scoped`]; it borrows the signal, so it can
/// never outlive it.
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use tabula_core::Signal;
///
/// let reset = Signal::<()>::new();
/// let seen = Arc::new(AtomicUsize::new(0));
/// {
///     let seen = seen.clone();
///     let _guard = reset.connect_scoped(move |_| {
///         seen.fetch_add(1, Ordering::SeqCst);
///     });
///     reset.emit(());
/// }
/// reset.emit(());
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
pub struct ConnectionGuard<'a, Args: 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<'_, Args> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn recorder<T: Clone + Send + 'static>(signal: &Signal<T>) -> (ConnectionId, Arc<Mutex<Vec<T>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let id = signal.connect(move |value: &T| sink.lock().push(value.clone()));
        (id, log)
    }

    #[test]
    fn test_every_slot_sees_every_emission() {
        let signal = Signal::<(usize, usize)>::new();
        let (_, first) = recorder(&signal);
        let (_, second) = recorder(&signal);

        signal.emit((0, 2));
        signal.emit((5, 5));

        assert_eq!(*first.lock(), vec![(0, 2), (5, 5)]);
        assert_eq!(*second.lock(), *first.lock());
    }

    #[test]
    fn test_disconnected_slot_stays_silent() {
        let signal = Signal::<u8>::new();
        let (id, log) = recorder(&signal);

        signal.emit(1);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(2);

        assert_eq!(*log.lock(), vec![1]);
    }

    #[test]
    fn test_blocked_signal_drops_emissions() {
        let signal = Signal::<u8>::new();
        let (_, log) = recorder(&signal);

        signal.set_blocked(true);
        signal.emit(1);
        assert!(signal.is_blocked());
        signal.set_blocked(false);
        signal.emit(2);

        assert_eq!(*log.lock(), vec![2]);
    }

    #[test]
    fn test_guard_disconnects_on_drop() {
        let signal = Signal::<u8>::new();
        let seen = Arc::new(AtomicUsize::new(0));
        {
            let seen = seen.clone();
            let guard = signal.connect_scoped(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            });
            assert_eq!(signal.connection_count(), 1);
            signal.emit(0);
            let _ = guard.id();
        }
        signal.emit(0);

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_disconnect_all() {
        let signal = Signal::<()>::new();
        (0..3).for_each(|_| {
            signal.connect(|_| {});
        });
        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_slot_may_reenter_signal() {
        let signal = Arc::new(Signal::<u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&signal);
        let counter = calls.clone();
        signal.connect(move |&depth| {
            counter.fetch_add(1, Ordering::SeqCst);
            if depth == 0
                && let Some(signal) = weak.upgrade()
            {
                signal.emit(1);
                signal.connect(|_| {});
            }
        });

        signal.emit(0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(signal.connection_count(), 2);
    }
}
