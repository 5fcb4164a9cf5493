//! A flat list exposed as an [`ItemModel`].
//!
//! Every mutating method on [`ListModel`] runs inside the matching edit
//! bracket, so persistent indices into the list track their items.

use parking_lot::RwLock;

use super::base::ModelBase;
use super::index::ModelIndex;
use super::role::{ItemData, ItemRole, TriState};
use super::traits::{ItemFlags, ItemModel};

/// An element of a [`ListModel`].
///
/// ```
/// use tabula::model::{ItemData, ItemRole, ListItem};
///
/// struct Track {
///     title: String,
///     seconds: i64,
/// }
///
/// impl ListItem for Track {
///     fn display(&self) -> ItemData {
///         ItemData::from(self.title.as_str())
///     }
///
///     fn data(&self, role: ItemRole) -> ItemData {
///         match role {
///             ItemRole::Sort => ItemData::from(self.seconds),
///             _ => ItemData::None,
///         }
///     }
/// }
/// ```
pub trait ListItem: Send + Sync {
    fn display(&self) -> ItemData;

    fn tooltip(&self) -> ItemData {
        ItemData::None
    }

    /// Value for an editor; the display value unless overridden.
    fn edit(&self) -> ItemData {
        self.display()
    }

    /// Any role other than `Display`, `ToolTip` and `Edit`.
    fn data(&self, _role: ItemRole) -> ItemData {
        ItemData::None
    }

    fn flags(&self) -> ItemFlags {
        ItemFlags::new()
    }

    /// Stores an edited value. Returns `false` if the item refuses it.
    fn set_data(&mut self, _value: ItemData, _role: ItemRole) -> bool {
        false
    }
}

/// Strings display themselves and accept text edits.
impl ListItem for String {
    fn display(&self) -> ItemData {
        ItemData::String(self.clone())
    }

    fn flags(&self) -> ItemFlags {
        ItemFlags::editable()
    }

    fn set_data(&mut self, value: ItemData, role: ItemRole) -> bool {
        match (role, value.into_string()) {
            (ItemRole::Display | ItemRole::Edit, Some(text)) => {
                *self = text;
                true
            }
            _ => false,
        }
    }
}

/// A single-column list of [`ListItem`]s.
///
/// ```
/// use tabula::model::{ItemModel, ListModel, ModelIndex};
///
/// let model = ListModel::new(vec!["one".to_string(), "two".to_string()]);
/// let two = model.persistent_index(&model.index(1, 0, &ModelIndex::invalid()));
///
/// model.insert(0, "zero".to_string());
/// assert_eq!(two.row(), Some(2));
/// ```
pub struct ListModel<T> {
    items: RwLock<Vec<T>>,
    base: ModelBase,
}

impl<T: ListItem + 'static> ListModel<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            base: ModelBase::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends an item.
    pub fn push(&self, item: T) {
        let row = self.len();
        self.insert(row, item);
    }

    /// Inserts `item` so that it ends up at `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row > len()`.
    pub fn insert(&self, row: usize, item: T) {
        self.begin_insert_rows(&ModelIndex::invalid(), row, row);
        self.items.write().insert(row, item);
        self.end_insert_rows();
    }

    /// Removes the item at `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= len()`.
    pub fn remove(&self, row: usize) -> T {
        self.begin_delete_rows(&ModelIndex::invalid(), row, row);
        let item = self.items.write().remove(row);
        self.end_delete_rows();
        item
    }

    /// Removes and returns the items `first..=last`.
    ///
    /// # Panics
    ///
    /// Panics if the range is inverted or reaches past the end.
    pub fn remove_rows(&self, first: usize, last: usize) -> Vec<T> {
        self.begin_delete_rows(&ModelIndex::invalid(), first, last);
        let removed: Vec<T> = self.items.write().drain(first..=last).collect();
        self.end_delete_rows();
        removed
    }

    /// Moves the items `first..=last` so that the first of them ends up at
    /// `target` in the resulting list.
    ///
    /// # Panics
    ///
    /// Panics if the range or the target lies outside the list.
    pub fn move_rows(&self, first: usize, last: usize, target: usize) {
        let root = ModelIndex::invalid();
        self.begin_move_rows(&root, first, last, &root, target);
        {
            let mut items = self.items.write();
            let moved: Vec<T> = items.drain(first..=last).collect();
            items.splice(target..target, moved);
        }
        self.end_move_rows();
    }

    /// Empties the list. All persistent indices become invalid.
    pub fn clear(&self) {
        self.begin_model_reset();
        self.items.write().clear();
        self.end_model_reset();
    }

    /// Swaps in a new item list, resetting the model.
    pub fn set_items(&self, items: Vec<T>) {
        self.begin_model_reset();
        *self.items.write() = items;
        self.end_model_reset();
    }

    /// Read guard over the items. Do not edit the model while holding it.
    pub fn items(&self) -> impl std::ops::Deref<Target = Vec<T>> + '_ {
        self.items.read()
    }

    /// Runs `f` on the item at `row`, then emits `data_changed` for it.
    pub fn modify<F, R>(&self, row: usize, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let result = f(self.items.write().get_mut(row)?);
        self.signals().emit_data_changed_single(
            ModelIndex::new(row, 0, ModelIndex::invalid()),
            vec![ItemRole::Display],
        );
        Some(result)
    }
}

impl<T: ListItem + 'static> Default for ListModel<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: ListItem + 'static> ItemModel for ListModel<T> {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        if parent.is_valid() { 0 } else { self.len() }
    }

    fn column_count(&self, _parent: &ModelIndex) -> usize {
        1
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        if !index.is_valid() || index.has_parent() {
            return ItemData::None;
        }
        let items = self.items.read();
        let Some(item) = items.get(index.row()) else {
            return ItemData::None;
        };
        match role {
            ItemRole::Display => item.display(),
            ItemRole::ToolTip => item.tooltip(),
            ItemRole::Edit => item.edit(),
            role => item.data(role),
        }
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if parent.is_valid() || column > 0 || row >= self.len() {
            return ModelIndex::invalid();
        }
        ModelIndex::new(row, column, ModelIndex::invalid())
    }

    fn parent(&self, _index: &ModelIndex) -> ModelIndex {
        ModelIndex::invalid()
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        if !index.is_valid() {
            return ItemFlags::disabled();
        }

        self.items
            .read()
            .get(index.row())
            .map(|item| item.flags())
            .unwrap_or_else(ItemFlags::disabled)
    }

    fn set_data(&self, index: &ModelIndex, value: ItemData, role: ItemRole) -> bool {
        if !index.is_valid() || index.has_parent() {
            return false;
        }
        let changed = match self.items.write().get_mut(index.row()) {
            Some(item) => item.set_data(value, role),
            None => false,
        };
        if changed {
            self.signals()
                .emit_data_changed_single(index.clone(), vec![role]);
        }
        changed
    }

    fn data_matches(&self, index: &ModelIndex, value: &ItemData) -> TriState {
        let Some(term) = value.to_text() else {
            return TriState::Unknown;
        };
        match self.data(index, ItemRole::Display).to_text() {
            Some(text) => TriState::from(text.contains(&term)),
            None => TriState::Unknown,
        }
    }

    fn is_searchable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchesFlags;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn root() -> ModelIndex {
        ModelIndex::invalid()
    }

    fn model(items: &[&str]) -> ListModel<String> {
        ListModel::new(items.iter().map(|s| s.to_string()).collect())
    }

    fn texts(model: &ListModel<String>) -> Vec<String> {
        model.items().clone()
    }

    #[test]
    fn test_basic_queries() {
        let model = model(&["a", "b", "c"]);
        assert_eq!(model.row_count(&root()), 3);
        assert_eq!(model.column_count(&root()), 1);
        let index = model.index(1, 0, &root());
        assert_eq!(model.display_text(&index).as_deref(), Some("b"));
        assert!(!model.index(3, 0, &root()).is_valid());
        assert!(!model.index(0, 1, &root()).is_valid());
        assert_eq!(model.row_count(&index), 0);
    }

    #[test]
    fn test_push_and_insert_shift_persistent_indices() {
        let model = model(&["a", "b"]);
        let b = model.persistent_index(&model.index(1, 0, &root()));

        model.insert(0, "z".to_string());
        assert_eq!(b.row(), Some(2));

        model.push("c".to_string());
        assert_eq!(b.row(), Some(2));
        assert_eq!(texts(&model), vec!["z", "a", "b", "c"]);
    }

    #[test]
    fn test_remove_rows() {
        let model = model(&["a", "b", "c", "d", "e"]);
        let d = model.persistent_index(&model.index(3, 0, &root()));
        let b = model.persistent_index(&model.index(1, 0, &root()));

        let removed = model.remove_rows(1, 2);

        assert_eq!(removed, vec!["b", "c"]);
        assert_eq!(d.row(), Some(1));
        assert!(!b.is_valid());
        assert_eq!(model.display_text(&d.index()).as_deref(), Some("d"));
    }

    #[test]
    fn test_move_rows_down() {
        let model = model(&["a", "b", "c"]);
        let a = model.persistent_index(&model.index(0, 0, &root()));

        model.move_rows(0, 0, 2);

        assert_eq!(texts(&model), vec!["b", "c", "a"]);
        assert_eq!(a.row(), Some(2));
    }

    #[test]
    fn test_move_rows_up() {
        let model = model(&["a", "b", "c", "d", "e"]);
        let refs: Vec<_> = (0..5)
            .map(|r| model.persistent_index(&model.index(r, 0, &root())))
            .collect();

        model.move_rows(3, 4, 0);

        assert_eq!(texts(&model), vec!["d", "e", "a", "b", "c"]);
        for held in &refs {
            let text = model.display_text(&held.index()).unwrap();
            assert_eq!(texts(&model)[held.row().unwrap()], text);
        }
    }

    #[test]
    fn test_clear_invalidates() {
        let model = model(&["a"]);
        let a = model.persistent_index(&model.index(0, 0, &root()));
        model.clear();
        assert!(!a.is_valid());
        assert!(model.is_empty());
    }

    #[test]
    fn test_set_data_emits_data_changed() {
        let model = model(&["a"]);
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        model.signals().data_changed.connect(move |(top_left, _, roles)| {
            sink.lock().push((top_left.row(), roles.clone()));
        });

        let index = model.index(0, 0, &root());
        assert!(model.is_editable(&index));
        assert!(model.set_data(&index, ItemData::from("x"), ItemRole::Edit));
        assert!(!model.set_data(&index, ItemData::from(1), ItemRole::Edit));

        assert_eq!(texts(&model), vec!["x"]);
        assert_eq!(*changes.lock(), vec![(0, vec![ItemRole::Edit])]);
    }

    #[test]
    fn test_signals_fire_after_storage_changes() {
        let model = Arc::new(model(&["a"]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observed = Arc::downgrade(&model);
        model.signals().rows_inserted.connect(move |_| {
            if let Some(model) = observed.upgrade() {
                sink.lock().push(model.len());
            }
        });

        model.push("b".to_string());
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_matches() {
        let model = model(&["apple", "banana", "apricot"]);
        let flags = MatchesFlags {
            match_at_start: true,
            ..Default::default()
        };
        let found: Vec<_> = model
            .matches("ap", flags, &root())
            .iter()
            .map(|i| i.row())
            .collect();
        assert_eq!(found, vec![0, 2]);

        let first = MatchesFlags {
            first_match_only: true,
            ..flags
        };
        assert_eq!(model.matches("ap", first, &root()).len(), 1);
        assert_eq!(
            model.data_matches(&model.index(1, 0, &root()), &ItemData::from("nan")),
            TriState::True
        );
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_remove_past_end_panics() {
        model(&["a"]).remove(1);
    }
}
