//! Cell addresses.
//!
//! A [`ModelIndex`] names one cell by its row, its column and the chain of
//! parents above it. It is a plain value: it does not track edits, so it is
//! only meaningful until the model next changes shape.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// Address of a cell in an [`ItemModel`](super::ItemModel).
///
/// The invalid index has no row, column or parent of its own. It stands for
/// "no cell" and, when passed as a parent, for the model root.
///
/// Equality and hashing look at the row, the column and the parent chain.
/// The internal id is a tag owned by the model that vended the index (a node
/// id for trees, a mapping key for proxies) and never takes part in either.
///
/// Use a [`PersistentModelIndex`](super::PersistentModelIndex) to keep a
/// reference across inserts, deletes and moves.
///
/// ```ignore
/// use tabula::model::{ItemModel, ModelIndex};
///
/// let top = model.index(0, 0, &ModelIndex::invalid());
/// let child = model.index(2, 0, &top);
/// assert_eq!(child.parent(), top);
/// ```
#[derive(Clone)]
pub struct ModelIndex {
    row: usize,
    column: usize,
    /// `None` for top-level cells and for the invalid index.
    parent: Option<Box<ModelIndex>>,
    internal_id: u64,
    valid: bool,
}

impl Default for ModelIndex {
    fn default() -> Self {
        Self::invalid()
    }
}

impl ModelIndex {
    /// The invalid index, which doubles as the root parent.
    #[inline]
    pub const fn invalid() -> Self {
        Self {
            row: 0,
            column: 0,
            parent: None,
            internal_id: 0,
            valid: false,
        }
    }

    /// A valid index at `row`/`column` under `parent`, tagged with 0.
    #[inline]
    pub fn new(row: usize, column: usize, parent: ModelIndex) -> Self {
        Self::with_internal_id(row, column, parent, 0)
    }

    /// A valid index carrying a model-defined tag.
    #[inline]
    pub fn with_internal_id(row: usize, column: usize, parent: ModelIndex, internal_id: u64) -> Self {
        Self {
            row,
            column,
            parent: parent.is_valid().then(|| Box::new(parent)),
            internal_id,
            valid: true,
        }
    }

    /// The same cell placed somewhere else, keeping its tag.
    ///
    /// Relocating the invalid index yields the invalid index.
    pub fn relocated(&self, row: usize, column: usize, parent: ModelIndex) -> ModelIndex {
        if !self.is_valid() {
            return ModelIndex::invalid();
        }
        ModelIndex::with_internal_id(row, column, parent, self.internal_id)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Row under the parent; 0 for the invalid index.
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    /// Column under the parent; 0 for the invalid index.
    #[inline]
    pub fn column(&self) -> usize {
        self.column
    }

    /// The parent cell, or the invalid index for top-level cells.
    #[inline]
    pub fn parent(&self) -> ModelIndex {
        self.parent.as_deref().cloned().unwrap_or_default()
    }

    #[inline]
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    #[inline]
    pub fn internal_id(&self) -> u64 {
        self.internal_id
    }

    /// Number of parents above this cell. Top-level cells are at depth 0.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent.as_deref(), |index| index.parent.as_deref()).count()
    }

    /// Parents of this cell, nearest first.
    pub fn ancestors(&self) -> Vec<ModelIndex> {
        std::iter::successors(self.parent.as_deref(), |index| index.parent.as_deref())
            .cloned()
            .collect()
    }

    /// Sort key: shallower cells first, then parent, row and column.
    fn position_cmp(&self, other: &Self) -> Ordering {
        self.depth()
            .cmp(&other.depth())
            .then_with(|| self.parent.cmp(&other.parent))
            .then_with(|| (self.row, self.column).cmp(&(other.row, other.column)))
    }
}

impl std::fmt::Debug for ModelIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_valid() {
            return f.write_str("ModelIndex(invalid)");
        }
        f.debug_struct("ModelIndex")
            .field("row", &self.row)
            .field("column", &self.column)
            .field("parent", &self.parent)
            .field("internal_id", &self.internal_id)
            .finish()
    }
}

impl PartialEq for ModelIndex {
    fn eq(&self, other: &Self) -> bool {
        if self.valid != other.valid {
            return false;
        }
        !self.valid
            || (self.row, self.column, &self.parent) == (other.row, other.column, &other.parent)
    }
}

impl Eq for ModelIndex {}

impl Hash for ModelIndex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.valid {
            (self.row, self.column, &self.parent).hash(state);
        } else {
            state.write_u8(0);
        }
    }
}

impl PartialOrd for ModelIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The invalid index sorts first.
impl Ord for ModelIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.valid, other.valid) {
            (true, true) => self.position_cmp(other),
            (a, b) => a.cmp(&b),
        }
    }
}
