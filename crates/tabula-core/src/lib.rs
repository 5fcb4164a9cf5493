//! Core plumbing for tabula.
//!
//! [`Signal`] carries model notifications to their observers, [`logging`]
//! names the `tracing` targets, and [`trace`] remembers where errors were
//! raised on the current thread.
//!
//! ```
//! use tabula_core::Signal;
//!
//! let removed = Signal::<(usize, usize)>::new();
//! let id = removed.connect(|(first, last)| println!("rows {first}..={last} removed"));
//! removed.emit((2, 4));
//! removed.disconnect(id);
//! ```

pub mod logging;
pub mod signal;
pub mod trace;

pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
