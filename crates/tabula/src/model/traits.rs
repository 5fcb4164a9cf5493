//! The model capability surface.
//!
//! [`ItemModel`] is what every model, source or proxy, answers. It also
//! carries the edit brackets that keep persistent indices in step with
//! structural changes, and [`ModelSignals`] is what it emits.

use tabula_core::Signal;

use super::base::ModelBase;
use super::index::ModelIndex;
use super::operation::{Direction, Operation, OperationKind};
use super::persistent::PersistentModelIndex;
use super::role::{ItemData, ItemRole, TriState};

/// What a view may do with a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemFlags {
    pub selectable: bool,
    pub editable: bool,
    pub drag_enabled: bool,
    pub enabled: bool,
    /// Lets a view skip the expand affordance without asking for rows.
    pub never_has_children: bool,
}

impl ItemFlags {
    /// Selectable and enabled, nothing else.
    pub fn new() -> Self {
        Self {
            selectable: true,
            enabled: true,
            ..Default::default()
        }
    }

    /// Flags of a cell that does not exist or cannot be interacted with.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Selectable, enabled and editable.
    pub fn editable() -> Self {
        Self {
            selectable: true,
            editable: true,
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn with_drag(mut self, enabled: bool) -> Self {
        self.drag_enabled = enabled;
        self
    }
}

/// Payload of [`ModelSignals::model_updated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateFlags {
    /// Plain indices obtained before the update may no longer be valid.
    pub invalidate_indices: bool,
    /// The model only grew internal bookkeeping; nothing an observer could
    /// have seen before the update changed.
    pub cache_only: bool,
}

impl UpdateFlags {
    /// Every previously obtained index must be dropped.
    pub const fn invalidate_all() -> Self {
        Self {
            invalidate_indices: true,
            cache_only: false,
        }
    }

    /// Only row membership or order changed; the model's internal tables
    /// survived.
    pub const fn keep_indices() -> Self {
        Self {
            invalidate_indices: false,
            cache_only: false,
        }
    }

    /// New internal tables were built on demand. Rows, order and data are
    /// exactly as before.
    pub const fn cache_extended() -> Self {
        Self {
            invalidate_indices: false,
            cache_only: true,
        }
    }
}

/// Options for [`ItemModel::matches`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchesFlags {
    /// Stop after the first hit.
    pub first_match_only: bool,
    /// Ignore case when comparing.
    pub case_insensitive: bool,
    /// The text must start with the term.
    pub match_at_start: bool,
    /// The text must equal the term.
    pub match_full: bool,
}

impl MatchesFlags {
    /// Returns `true` if `text` matches `term` under these flags.
    pub fn accepts(&self, text: &str, term: &str) -> bool {
        let (text, term) = if self.case_insensitive {
            (text.to_lowercase(), term.to_lowercase())
        } else {
            (text.to_string(), term.to_string())
        };
        if self.match_full {
            text == term
        } else if self.match_at_start {
            text.starts_with(&term)
        } else {
            text.contains(&term)
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// Which header [`ItemModel::header_data`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Column titles.
    Horizontal,
    /// Row labels.
    Vertical,
}

/// A tree of rows, each row a list of cells.
///
/// Implementors provide navigation (`row_count`, `column_count`, `index`,
/// `parent`), cell values (`data`) and the [`ModelBase`] holding their
/// signals and persistent indices. Everything else has a default.
///
/// # Structural edits
///
/// Every insertion, removal or move of rows or columns must be bracketed by
/// the matching `begin_*`/`end_*` pair: call `begin_*` before touching
/// storage, `end_*` after. The `end_*` call rewrites every
/// [`PersistentModelIndex`] and notifies observers. Brackets nest; each
/// `end_*` closes the innermost open `begin_*` and must match its kind and
/// direction.
///
/// Never hold a storage lock across `end_*`: observers usually query the
/// model from their slots.
///
/// # Example
///
/// ```ignore
/// use tabula::model::{ItemData, ItemModel, ItemRole, ModelBase, ModelIndex};
/// use parking_lot::RwLock;
///
/// struct Names {
///     items: RwLock<Vec<String>>,
///     base: ModelBase,
/// }
///
/// impl Names {
///     fn push(&self, name: String) {
///         let row = self.items.read().len();
///         self.begin_insert_rows(&ModelIndex::invalid(), row, row);
///         self.items.write().push(name);
///         self.end_insert_rows();
///     }
/// }
///
/// impl ItemModel for Names {
///     fn row_count(&self, parent: &ModelIndex) -> usize {
///         if parent.is_valid() { 0 } else { self.items.read().len() }
///     }
///
///     fn column_count(&self, _parent: &ModelIndex) -> usize {
///         1
///     }
///
///     fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
///         match (role, self.items.read().get(index.row())) {
///             (ItemRole::Display, Some(name)) if index.is_valid() => ItemData::from(name.as_str()),
///             _ => ItemData::None,
///         }
///     }
///
///     fn index(&self, row: usize, col: usize, parent: &ModelIndex) -> ModelIndex {
///         if parent.is_valid() || col > 0 || row >= self.items.read().len() {
///             ModelIndex::invalid()
///         } else {
///             ModelIndex::new(row, col, ModelIndex::invalid())
///         }
///     }
///
///     fn parent(&self, _index: &ModelIndex) -> ModelIndex {
///         ModelIndex::invalid()
///     }
///
///     fn base(&self) -> &ModelBase {
///         &self.base
///     }
/// }
/// ```
pub trait ItemModel: Send + Sync {
    /// Rows directly under `parent` (the invalid index for the root).
    fn row_count(&self, parent: &ModelIndex) -> usize;

    fn column_count(&self, parent: &ModelIndex) -> usize;

    /// Value of a cell for one role; `ItemData::None` when there is none.
    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData;

    /// Index of a cell, or the invalid index if there is no such cell.
    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex;

    fn parent(&self, index: &ModelIndex) -> ModelIndex;

    fn base(&self) -> &ModelBase;

    fn signals(&self) -> &ModelSignals {
        self.base().signals()
    }

    /// Writes a cell. Models are read-only unless they override this.
    fn set_data(&self, _index: &ModelIndex, _value: ItemData, _role: ItemRole) -> bool {
        false
    }

    fn flags(&self, _index: &ModelIndex) -> ItemFlags {
        ItemFlags::new()
    }

    fn is_editable(&self, index: &ModelIndex) -> bool {
        self.flags(index).editable
    }

    fn has_children(&self, parent: &ModelIndex) -> bool {
        self.row_count(parent) > 0
    }

    fn header_data(&self, _section: usize, _orientation: Orientation, _role: ItemRole) -> ItemData {
        ItemData::None
    }

    /// Display text of a column header, or an empty string.
    fn column_name(&self, column: usize) -> String {
        self.header_data(column, Orientation::Horizontal, ItemRole::Display)
            .into_string()
            .unwrap_or_default()
    }

    /// The column that carries the tree structure and is searched by
    /// [`matches`](ItemModel::matches).
    fn tree_column(&self) -> usize {
        0
    }

    /// Whether the cell can be dragged as one of `mime_types`.
    fn accepts_drag(&self, _index: &ModelIndex, _mime_types: &[&str]) -> bool {
        false
    }

    /// Whether [`matches`](ItemModel::matches) is meaningful for this model.
    fn is_searchable(&self) -> bool {
        false
    }

    fn is_column_sortable(&self, _column: usize) -> bool {
        true
    }

    /// Model-specific answer to "does this cell match `value`?".
    fn data_matches(&self, _index: &ModelIndex, _value: &ItemData) -> TriState {
        TriState::Unknown
    }

    /// Finds the children of `parent` whose display text matches `term`.
    ///
    /// The default scans [`tree_column`](ItemModel::tree_column) of every
    /// row under `parent`.
    fn matches(&self, term: &str, flags: MatchesFlags, parent: &ModelIndex) -> Vec<ModelIndex> {
        let mut found = Vec::new();
        let column = self.tree_column();
        for row in 0..self.row_count(parent) {
            let index = self.index(row, column, parent);
            let Some(text) = self.data(&index, ItemRole::Display).to_text() else {
                continue;
            };
            if flags.accepts(&text, term) {
                found.push(index);
                if flags.first_match_only {
                    break;
                }
            }
        }
        found
    }

    /// Orders rows by `column`, or restores the natural order for `None`.
    /// Models that cannot sort ignore this.
    fn sort(&self, _column: Option<usize>, _order: SortOrder) {}

    /// Drops every persistent index and tells observers to start over.
    fn invalidate(&self) {
        self.base().invalidate();
    }

    /// A reference to `index` that survives structural edits.
    fn persistent_index(&self, index: &ModelIndex) -> PersistentModelIndex {
        self.base().persistent_index(index)
    }

    fn display_text(&self, index: &ModelIndex) -> Option<String> {
        self.data(index, ItemRole::Display).into_string()
    }

    /// The cell at `row`/`column` under the same parent as `index`.
    fn sibling(&self, index: &ModelIndex, row: usize, column: usize) -> ModelIndex {
        if !index.is_valid() {
            return ModelIndex::invalid();
        }
        self.index(row, column, &index.parent())
    }

    /// Announces that rows `first..=last` will be inserted under `parent`.
    #[track_caller]
    fn begin_insert_rows(&self, parent: &ModelIndex, first: usize, last: usize) {
        let extent = self.row_count(parent);
        self.base().begin(
            Operation::insert(Direction::Row, parent.clone(), first, last),
            extent,
            extent,
        );
    }

    /// Commits the pending row insertion.
    #[track_caller]
    fn end_insert_rows(&self) {
        self.base().end(OperationKind::Insert, Direction::Row);
    }

    /// Announces that columns `first..=last` will be inserted under `parent`.
    #[track_caller]
    fn begin_insert_columns(&self, parent: &ModelIndex, first: usize, last: usize) {
        let extent = self.column_count(parent);
        self.base().begin(
            Operation::insert(Direction::Column, parent.clone(), first, last),
            extent,
            extent,
        );
    }

    /// Commits the pending column insertion.
    #[track_caller]
    fn end_insert_columns(&self) {
        self.base().end(OperationKind::Insert, Direction::Column);
    }

    /// Announces that rows `first..=last` under `parent` will be removed.
    #[track_caller]
    fn begin_delete_rows(&self, parent: &ModelIndex, first: usize, last: usize) {
        let extent = self.row_count(parent);
        self.base().begin(
            Operation::delete(Direction::Row, parent.clone(), first, last),
            extent,
            extent,
        );
    }

    /// Commits the pending row removal.
    #[track_caller]
    fn end_delete_rows(&self) {
        self.base().end(OperationKind::Delete, Direction::Row);
    }

    /// Announces that columns `first..=last` under `parent` will be removed.
    #[track_caller]
    fn begin_delete_columns(&self, parent: &ModelIndex, first: usize, last: usize) {
        let extent = self.column_count(parent);
        self.base().begin(
            Operation::delete(Direction::Column, parent.clone(), first, last),
            extent,
            extent,
        );
    }

    /// Commits the pending column removal.
    #[track_caller]
    fn end_delete_columns(&self) {
        self.base().end(OperationKind::Delete, Direction::Column);
    }

    /// Announces that rows `first..=last` under `source_parent` will move
    /// under `target_parent`, the first of them ending up at row `target`.
    ///
    /// For a move within one parent, `target` is counted in the final
    /// order: moving row 0 of three rows to the end uses `target == 2`.
    #[track_caller]
    fn begin_move_rows(
        &self,
        source_parent: &ModelIndex,
        first: usize,
        last: usize,
        target_parent: &ModelIndex,
        target: usize,
    ) {
        let source_extent = self.row_count(source_parent);
        let target_extent = self.row_count(target_parent);
        self.base().begin(
            Operation::moving(
                Direction::Row,
                source_parent.clone(),
                first,
                last,
                target_parent.clone(),
                target,
            ),
            source_extent,
            target_extent,
        );
    }

    /// Commits the pending row move.
    #[track_caller]
    fn end_move_rows(&self) {
        self.base().end(OperationKind::Move, Direction::Row);
    }

    /// Column counterpart of [`begin_move_rows`](ItemModel::begin_move_rows).
    #[track_caller]
    fn begin_move_columns(
        &self,
        source_parent: &ModelIndex,
        first: usize,
        last: usize,
        target_parent: &ModelIndex,
        target: usize,
    ) {
        let source_extent = self.column_count(source_parent);
        let target_extent = self.column_count(target_parent);
        self.base().begin(
            Operation::moving(
                Direction::Column,
                source_parent.clone(),
                first,
                last,
                target_parent.clone(),
                target,
            ),
            source_extent,
            target_extent,
        );
    }

    /// Commits the pending column move.
    #[track_caller]
    fn end_move_columns(&self) {
        self.base().end(OperationKind::Move, Direction::Column);
    }

    /// Announces that the whole model is about to be replaced.
    #[track_caller]
    fn begin_model_reset(&self) {
        self.base().begin(Operation::reset(), 0, 0);
    }

    /// Commits the reset: every persistent index becomes invalid.
    #[track_caller]
    fn end_model_reset(&self) {
        self.base().end(OperationKind::Reset, Direction::Row);
    }
}

/// Notifications a model sends to views and proxies.
///
/// A committed structural edit fires its `rows_*` or `columns_*` signal with
/// the [`Operation`], then `model_updated`. A reset fires `model_reset`, then
/// `model_updated`. A proxy that re-derives its mapping without touching its
/// source fires only `model_updated` with [`UpdateFlags::keep_indices`], and
/// one that merely built a mapping on demand fires it with
/// [`UpdateFlags::cache_extended`].
pub struct ModelSignals {
    pub rows_inserted: Signal<Operation>,
    pub rows_removed: Signal<Operation>,
    pub rows_moved: Signal<Operation>,
    pub columns_inserted: Signal<Operation>,
    pub columns_removed: Signal<Operation>,
    pub columns_moved: Signal<Operation>,
    pub model_reset: Signal<()>,
    /// `(top_left, bottom_right, roles)` of the changed cells.
    pub data_changed: Signal<(ModelIndex, ModelIndex, Vec<ItemRole>)>,
    pub model_updated: Signal<UpdateFlags>,
}

impl Default for ModelSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelSignals {
    pub fn new() -> Self {
        Self {
            rows_inserted: Signal::new(),
            rows_removed: Signal::new(),
            rows_moved: Signal::new(),
            columns_inserted: Signal::new(),
            columns_removed: Signal::new(),
            columns_moved: Signal::new(),
            model_reset: Signal::new(),
            data_changed: Signal::new(),
            model_updated: Signal::new(),
        }
    }

    /// Reports a change confined to one cell.
    pub fn emit_data_changed_single(&self, index: ModelIndex, roles: Vec<ItemRole>) {
        self.data_changed.emit((index.clone(), index, roles));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_flags() {
        let flags = ItemFlags::new();
        assert!(flags.selectable);
        assert!(flags.enabled);
        assert!(!flags.editable);

        let editable = ItemFlags::editable();
        assert!(editable.editable);
        assert!(editable.selectable);
        assert!(ItemFlags::new().with_drag(true).drag_enabled);
    }

    #[test]
    fn test_model_signals_creation() {
        let signals = ModelSignals::new();
        assert_eq!(signals.rows_inserted.connection_count(), 0);
        assert_eq!(signals.model_updated.connection_count(), 0);
    }

    #[test]
    fn test_update_flags() {
        assert!(UpdateFlags::invalidate_all().invalidate_indices);
        assert!(!UpdateFlags::keep_indices().invalidate_indices);
        assert!(!UpdateFlags::keep_indices().cache_only);
        assert!(UpdateFlags::cache_extended().cache_only);
        assert!(!UpdateFlags::cache_extended().invalidate_indices);
    }

    #[test]
    fn test_matches_flags() {
        let contains = MatchesFlags::default();
        assert!(contains.accepts("keep a", "ep"));
        assert!(!contains.accepts("Keep", "keep"));

        let insensitive = MatchesFlags {
            case_insensitive: true,
            ..Default::default()
        };
        assert!(insensitive.accepts("Keep", "keep"));

        let at_start = MatchesFlags {
            match_at_start: true,
            ..Default::default()
        };
        assert!(at_start.accepts("keep a", "keep"));
        assert!(!at_start.accepts("a keep", "keep"));

        let full = MatchesFlags {
            match_full: true,
            ..Default::default()
        };
        assert!(full.accepts("keep", "keep"));
        assert!(!full.accepts("keep a", "keep"));
    }
}
