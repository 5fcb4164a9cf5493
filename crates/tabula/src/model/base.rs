//! Shared state behind every model: signals, persistent indices and the
//! stack of pending edit operations.

use parking_lot::Mutex;

use super::index::ModelIndex;
use super::operation::{Direction, Operation, OperationKind};
use super::persistent::{PersistentIndexRegistry, PersistentModelIndex};
use super::traits::{ModelSignals, UpdateFlags};
use crate::error::{Error, Result, contract_violation};

/// Bookkeeping state embedded in each [`ItemModel`](super::ItemModel).
///
/// Models expose it through [`ItemModel::base`](super::ItemModel::base); the
/// provided `begin_*`/`end_*` methods of the trait drive it.
pub struct ModelBase {
    signals: ModelSignals,
    registry: Mutex<PersistentIndexRegistry>,
    operations: Mutex<Vec<Operation>>,
}

impl Default for ModelBase {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBase {
    /// Creates empty model state.
    pub fn new() -> Self {
        Self {
            signals: ModelSignals::new(),
            registry: Mutex::new(PersistentIndexRegistry::new()),
            operations: Mutex::new(Vec::new()),
        }
    }

    /// The model's signals.
    #[inline]
    pub fn signals(&self) -> &ModelSignals {
        &self.signals
    }

    /// Returns a persistent index for `index`.
    pub fn persistent_index(&self, index: &ModelIndex) -> PersistentModelIndex {
        self.registry.lock().register(index)
    }

    /// Number of live persistent handles.
    pub fn persistent_index_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Number of `begin_*` calls still waiting for their `end_*`.
    pub fn pending_operations(&self) -> usize {
        self.operations.lock().len()
    }

    /// Validates `operation` against the current extents and records it.
    ///
    /// `source_extent` is the row/column count under the source parent,
    /// `target_extent` the one under the target parent (equal for anything
    /// but a cross-parent move).
    ///
    /// # Panics
    ///
    /// Panics if the operation cannot apply to the current model.
    #[track_caller]
    pub(crate) fn begin(&self, operation: Operation, source_extent: usize, target_extent: usize) {
        if let Err(error) = validate(&operation, source_extent, target_extent) {
            contract_violation(error);
        }
        tabula_core::model_trace!(
            kind = ?operation.kind,
            direction = ?operation.direction,
            first = operation.first,
            last = operation.last,
            target = operation.target,
            "begin operation"
        );
        self.operations.lock().push(operation);
    }

    /// Commits the innermost pending operation.
    ///
    /// Rewrites the persistent indices, then emits the signal matching the
    /// operation followed by `model_updated`.
    ///
    /// # Panics
    ///
    /// Panics if no operation is pending or the innermost one is of a
    /// different kind or direction.
    #[track_caller]
    pub(crate) fn end(&self, kind: OperationKind, direction: Direction) {
        let operation = match self.pop(kind, direction) {
            Ok(operation) => operation,
            Err(error) => contract_violation(error),
        };

        self.registry.lock().apply(&operation);
        tabula_core::model_trace!(kind = ?operation.kind, "end operation");

        match (operation.kind, operation.direction) {
            (OperationKind::Reset, _) => self.signals.model_reset.emit(()),
            (OperationKind::Insert, Direction::Row) => self.signals.rows_inserted.emit(operation),
            (OperationKind::Insert, Direction::Column) => {
                self.signals.columns_inserted.emit(operation)
            }
            (OperationKind::Delete, Direction::Row) => self.signals.rows_removed.emit(operation),
            (OperationKind::Delete, Direction::Column) => {
                self.signals.columns_removed.emit(operation)
            }
            (OperationKind::Move, Direction::Row) => self.signals.rows_moved.emit(operation),
            (OperationKind::Move, Direction::Column) => self.signals.columns_moved.emit(operation),
        }
        self.notify_updated(UpdateFlags::invalidate_all());
    }

    #[track_caller]
    fn pop(&self, kind: OperationKind, direction: Direction) -> Result<Operation> {
        let expected = bracket_name(kind, direction);
        let mut operations = self.operations.lock();
        let Some(pending) = operations.last() else {
            tabula_core::trace::record();
            return Err(Error::NoPendingOperation { expected });
        };
        let matches = pending.kind == kind && (kind == OperationKind::Reset || pending.direction == direction);
        if !matches {
            tabula_core::trace::record();
            return Err(Error::OperationMismatch {
                expected,
                found_kind: pending.kind,
                found_direction: pending.direction,
            });
        }
        operations.pop().ok_or(Error::NoPendingOperation { expected })
    }

    /// Drops every persistent index and announces a reset.
    pub fn invalidate(&self) {
        tabula_core::model_debug!("invalidate");
        self.registry.lock().clear();
        self.signals.model_reset.emit(());
        self.notify_updated(UpdateFlags::invalidate_all());
    }

    /// Drops every persistent index without notifying anyone.
    pub(crate) fn clear_persistent_indices(&self) {
        self.registry.lock().clear();
    }

    /// Emits `model_updated` with the given flags.
    pub fn notify_updated(&self, flags: UpdateFlags) {
        self.signals.model_updated.emit(flags);
    }
}

fn bracket_name(kind: OperationKind, direction: Direction) -> &'static str {
    match (kind, direction) {
        (OperationKind::Insert, Direction::Row) => "insert_rows",
        (OperationKind::Insert, Direction::Column) => "insert_columns",
        (OperationKind::Delete, Direction::Row) => "delete_rows",
        (OperationKind::Delete, Direction::Column) => "delete_columns",
        (OperationKind::Move, Direction::Row) => "move_rows",
        (OperationKind::Move, Direction::Column) => "move_columns",
        (OperationKind::Reset, _) => "model_reset",
    }
}

#[track_caller]
fn validate(operation: &Operation, source_extent: usize, target_extent: usize) -> Result<()> {
    if operation.kind == OperationKind::Reset {
        return Ok(());
    }
    if operation.first > operation.last {
        return Err(Error::invalid_range(operation.first, operation.last));
    }

    match operation.kind {
        OperationKind::Insert => {
            if operation.first > source_extent {
                return Err(Error::out_of_bounds("first", operation.first, source_extent));
            }
        }
        OperationKind::Delete => {
            if operation.last >= source_extent {
                return Err(Error::out_of_bounds("last", operation.last, source_extent));
            }
        }
        OperationKind::Move => {
            if operation.last >= source_extent {
                return Err(Error::out_of_bounds("last", operation.last, source_extent));
            }
            if operation.is_move_within() {
                let end = operation.target + operation.count();
                if end > source_extent {
                    return Err(Error::out_of_bounds("move target", operation.target, source_extent));
                }
            } else {
                if operation.target > target_extent {
                    return Err(Error::out_of_bounds("move target", operation.target, target_extent));
                }
                let moved = operation.first..=operation.last;
                let into_moved = std::iter::once(operation.target_parent.clone())
                    .chain(operation.target_parent.ancestors())
                    .any(|ancestor| {
                        ancestor.is_valid()
                            && ancestor.parent() == operation.source_parent
                            && moved.contains(&operation.direction.coordinate(&ancestor))
                    });
                if into_moved {
                    tabula_core::trace::record();
                    return Err(Error::MoveIntoItself);
                }
            }
        }
        OperationKind::Reset => {}
    }
    Ok(())
}
