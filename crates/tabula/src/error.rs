//! Error types for tabula models.
//!
//! Most of these describe contract violations: a caller used the edit
//! brackets out of order, passed a range that does not exist, or handed a
//! proxy an index it did not vend. Model code logs them and panics. The few
//! APIs that let callers check first (such as
//! [`ProxyModel::try_map_to_source`](crate::model::ProxyModel::try_map_to_source))
//! return them as values.

use crate::model::{Direction, OperationKind};

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by model bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An `end_*` call arrived with no matching `begin_*`.
    #[error("end_{expected} called with no pending operation")]
    NoPendingOperation { expected: &'static str },

    /// An `end_*` call does not match the innermost `begin_*`.
    #[error("end_{expected} does not match pending {found_kind:?} of {found_direction:?}s")]
    OperationMismatch {
        expected: &'static str,
        found_kind: OperationKind,
        found_direction: Direction,
    },

    /// `first > last` in an edit bracket.
    #[error("invalid range: first {first} is after last {last}")]
    InvalidRange { first: usize, last: usize },

    /// A coordinate lies beyond the current extent of its axis.
    #[error("{what} {value} is out of bounds (extent {extent})")]
    OutOfBounds {
        what: &'static str,
        value: usize,
        extent: usize,
    },

    /// A move targets a parent that lies inside the moved range.
    #[error("cannot move items into one of the moved items")]
    MoveIntoItself,

    /// A proxy index refers to a mapping that no longer exists.
    #[error("index refers to a mapping that was discarded")]
    StaleIndex,

    /// A proxy index was not created by this proxy.
    #[error("index was not created by this model")]
    ForeignIndex,

    /// A proxy row points past the end of its mapping.
    #[error("row {row} is out of range for a mapping of {len} rows")]
    RowOutOfRange { row: usize, len: usize },
}

impl Error {
    /// Creates an out-of-bounds error.
    #[track_caller]
    pub fn out_of_bounds(what: &'static str, value: usize, extent: usize) -> Self {
        tabula_core::trace::record();
        Self::OutOfBounds {
            what,
            value,
            extent,
        }
    }

    /// Creates an invalid-range error.
    #[track_caller]
    pub fn invalid_range(first: usize, last: usize) -> Self {
        tabula_core::trace::record();
        Self::InvalidRange { first, last }
    }

    /// Creates a stale-index error.
    #[track_caller]
    pub fn stale_index() -> Self {
        tabula_core::trace::record();
        Self::StaleIndex
    }

    /// Creates a foreign-index error.
    #[track_caller]
    pub fn foreign_index() -> Self {
        tabula_core::trace::record();
        Self::ForeignIndex
    }

    /// Creates a row-out-of-range error.
    #[track_caller]
    pub fn row_out_of_range(row: usize, len: usize) -> Self {
        tabula_core::trace::record();
        Self::RowOutOfRange { row, len }
    }
}

/// Logs a contract violation and aborts the current call path.
#[track_caller]
pub(crate) fn contract_violation(error: Error) -> ! {
    tabula_core::model_error!(%error, "model contract violated");
    panic!("model contract violated: {error}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::trace::TraceScope;

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::invalid_range(4, 2).to_string(),
            "invalid range: first 4 is after last 2"
        );
        assert_eq!(
            Error::out_of_bounds("last row", 5, 5).to_string(),
            "last row 5 is out of bounds (extent 5)"
        );
    }

    #[test]
    fn test_constructors_record_trace() {
        let scope = TraceScope::new();
        let _ = Error::stale_index();
        let _ = Error::row_out_of_range(3, 1);
        let trace = scope.snapshot();
        assert_eq!(trace.len(), 2);
        assert!(trace.iter().all(|loc| loc.file().ends_with("error.rs")));
    }
}
