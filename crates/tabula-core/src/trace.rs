//! Per-thread error trace buffer.
//!
//! Error constructors call [`record`] (with `#[track_caller]`) so that the
//! source locations where errors were raised on this thread can be inspected
//! after the fact. The buffer is bounded: once [`CAPACITY`] locations have
//! been recorded, the oldest entry is dropped.
//!
//! The buffer belongs to the enclosing call context, not to the process:
//! open a [`TraceScope`] around the operation of interest. The scope clears
//! the buffer when it is created and again when it is dropped.
//!
//! ```
//! use tabula_core::trace::{self, TraceScope};
//!
//! let scope = TraceScope::new();
//! trace::record();
//! assert_eq!(scope.snapshot().len(), 1);
//! drop(scope);
//! assert!(trace::snapshot().is_empty());
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::Location;

/// Maximum number of locations kept per thread.
pub const CAPACITY: usize = 32;

thread_local! {
    static BUFFER: RefCell<VecDeque<&'static Location<'static>>> =
        RefCell::new(VecDeque::with_capacity(CAPACITY));
}

/// Record the caller's location.
#[track_caller]
pub fn record() {
    let location = Location::caller();
    BUFFER.with(|buffer| {
        let mut buffer = buffer.borrow_mut();
        if buffer.len() == CAPACITY {
            buffer.pop_front();
        }
        buffer.push_back(location);
    });
}

/// Forget every recorded location on this thread.
pub fn clear() {
    BUFFER.with(|buffer| buffer.borrow_mut().clear());
}

/// The recorded locations on this thread, oldest first.
pub fn snapshot() -> Vec<&'static Location<'static>> {
    BUFFER.with(|buffer| buffer.borrow().iter().copied().collect())
}

/// Ties the trace buffer's lifetime to a call context.
#[derive(Debug)]
pub struct TraceScope {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl TraceScope {
    /// Clear the buffer and start a new scope.
    pub fn new() -> Self {
        clear();
        Self {
            _not_send: std::marker::PhantomData,
        }
    }

    /// The locations recorded since the scope was opened.
    pub fn snapshot(&self) -> Vec<&'static Location<'static>> {
        snapshot()
    }
}

impl Default for TraceScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TraceScope {
    fn drop(&mut self) {
        clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_caller_location() {
        let scope = TraceScope::new();
        record();
        let trace = scope.snapshot();
        assert_eq!(trace.len(), 1);
        assert!(trace[0].file().ends_with("trace.rs"));
    }

    #[test]
    fn test_buffer_is_bounded() {
        let scope = TraceScope::new();
        for _ in 0..CAPACITY + 5 {
            record();
        }
        assert_eq!(scope.snapshot().len(), CAPACITY);
    }

    #[test]
    fn test_scope_clears_on_exit() {
        {
            let _scope = TraceScope::new();
            record();
        }
        assert!(snapshot().is_empty());
    }

    #[test]
    fn test_buffers_are_per_thread() {
        let _scope = TraceScope::new();
        record();
        let other = std::thread::spawn(|| snapshot().len()).join().unwrap();
        assert_eq!(other, 0);
        assert_eq!(snapshot().len(), 1);
    }
}
