//! Persistent model indices.
//!
//! A [`PersistentModelIndex`] keeps pointing at the same item while rows and
//! columns are inserted, removed and moved around it. The model owns one
//! [`PersistentHandle`] per referenced position in its
//! [`PersistentIndexRegistry`]; clients only hold weak references to it.
//! When an edit bracket is committed the registry rewrites every handle in
//! place, and drops the handles whose item went away.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::index::ModelIndex;
use super::operation::{Operation, OperationKind};

/// Shared record holding the current position of a persistently referenced
/// item.
#[derive(Debug)]
pub struct PersistentHandle {
    target: RwLock<ModelIndex>,
}

impl PersistentHandle {
    fn new(target: ModelIndex) -> Self {
        Self {
            target: RwLock::new(target),
        }
    }

    /// The position the handle currently points at.
    pub fn target(&self) -> ModelIndex {
        self.target.read().clone()
    }
}

/// A model index that follows its item across structural edits.
///
/// Persistent indices are weak: once the item is removed (or the model is
/// reset) the index reports itself invalid instead of dangling.
///
/// # Example
///
/// ```ignore
/// use tabula::model::{ItemModel, ListModel, ModelIndex};
///
/// let model = ListModel::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
/// let c = model.persistent_index(&model.index(2, 0, &ModelIndex::invalid()));
///
/// model.remove(0);
/// assert_eq!(c.row(), Some(1));
/// ```
#[derive(Clone, Default)]
pub struct PersistentModelIndex {
    handle: Option<Weak<PersistentHandle>>,
}

impl PersistentModelIndex {
    /// A persistent index that refers to nothing.
    pub const fn invalid() -> Self {
        Self { handle: None }
    }

    fn from_handle(handle: &Arc<PersistentHandle>) -> Self {
        Self {
            handle: Some(Arc::downgrade(handle)),
        }
    }

    fn handle(&self) -> Option<Arc<PersistentHandle>> {
        self.handle.as_ref()?.upgrade()
    }

    /// Returns `true` while the referenced item still exists.
    pub fn is_valid(&self) -> bool {
        self.handle().is_some()
    }

    /// The current position of the item, or an invalid index.
    pub fn index(&self) -> ModelIndex {
        self.handle()
            .map(|handle| handle.target())
            .unwrap_or_else(ModelIndex::invalid)
    }

    /// The current row of the item.
    pub fn row(&self) -> Option<usize> {
        self.handle().map(|handle| handle.target.read().row())
    }

    /// The current column of the item.
    pub fn column(&self) -> Option<usize> {
        self.handle().map(|handle| handle.target.read().column())
    }

    /// The current parent of the item, or an invalid index.
    pub fn parent(&self) -> ModelIndex {
        self.handle()
            .map(|handle| handle.target.read().parent())
            .unwrap_or_else(ModelIndex::invalid)
    }
}

impl PartialEq for PersistentModelIndex {
    fn eq(&self, other: &Self) -> bool {
        match (self.handle(), other.handle()) {
            (Some(a), Some(b)) => Arc::ptr_eq(&a, &b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Eq for PersistentModelIndex {}

impl std::fmt::Debug for PersistentModelIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.handle() {
            Some(handle) => f
                .debug_tuple("PersistentModelIndex")
                .field(&handle.target())
                .finish(),
            None => write!(f, "PersistentModelIndex(invalid)"),
        }
    }
}

/// Owner of every persistent handle of one model, keyed by current position.
#[derive(Debug, Default)]
pub struct PersistentIndexRegistry {
    handles: HashMap<ModelIndex, Arc<PersistentHandle>>,
}

impl PersistentIndexRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no handle is registered.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Returns a persistent index for `index`, sharing the existing handle if
    /// the position is already referenced.
    pub fn register(&mut self, index: &ModelIndex) -> PersistentModelIndex {
        if !index.is_valid() {
            return PersistentModelIndex::invalid();
        }
        let handle = self
            .handles
            .entry(index.clone())
            .or_insert_with(|| Arc::new(PersistentHandle::new(index.clone())));
        PersistentModelIndex::from_handle(handle)
    }

    /// Rewrites every handle for a committed operation.
    ///
    /// New positions are computed from the positions before the edit, then
    /// the registry is re-keyed in a single pass. Handles that nobody
    /// observes any more are dropped along the way.
    pub fn apply(&mut self, operation: &Operation) {
        if operation.kind == OperationKind::Reset {
            self.clear();
            return;
        }
        if operation.is_noop() {
            return;
        }

        let old = std::mem::take(&mut self.handles);
        let before = old.len();
        let mut removed = 0usize;

        for (position, handle) in old {
            if Arc::weak_count(&handle) == 0 {
                continue;
            }
            let Some(target) = operation.relocate(&position) else {
                removed += 1;
                continue;
            };
            if target != position {
                *handle.target.write() = target.clone();
            }
            if self.handles.insert(target.clone(), handle).is_some() {
                tracing::warn!(
                    target: "tabula::persistent",
                    ?target,
                    "two persistent handles relocated to the same position"
                );
            }
        }

        tracing::trace!(
            target: "tabula::persistent",
            kind = ?operation.kind,
            direction = ?operation.direction,
            first = operation.first,
            last = operation.last,
            before,
            removed,
            after = self.handles.len(),
            "rewrote persistent indices"
        );
    }

    /// Drops every handle; all outstanding persistent indices become invalid.
    pub fn clear(&mut self) {
        if !self.handles.is_empty() {
            tracing::trace!(
                target: "tabula::persistent",
                count = self.handles.len(),
                "cleared persistent indices"
            );
        }
        self.handles.clear();
    }
}
