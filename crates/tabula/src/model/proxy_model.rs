//! Proxy model for filtering and sorting.
//!
//! `ProxyModel` wraps a source model and presents a filtered and/or sorted
//! row order on top of the source data, without copying it. For every
//! source parent seen through the proxy it keeps a mapping: the ordered
//! list of persistent indices of the source rows that are visible under that
//! parent. Mappings are built lazily and dropped wholesale whenever the
//! source reports a structural update or a data change. Updates that only
//! announce a lazily built table ([`UpdateFlags::cache_extended`]) leave the
//! mappings alone, so proxies can be stacked.
//!
//! Proxy indices carry the key of their mapping as internal id. Keys come
//! from a slot map that is only ever cleared, so an index that outlived its
//! mapping is detected instead of resolved against someone else's rows.

use parking_lot::{Mutex, RwLock};
use slotmap::{Key, KeyData, SlotMap, new_key_type};
use std::collections::HashMap;
use std::sync::Arc;

use tabula_core::logging::targets;
use tabula_core::{ConnectionId, PerfSpan};

use super::base::ModelBase;
use super::index::ModelIndex;
use super::persistent::PersistentModelIndex;
use super::role::{ItemData, ItemRole, TriState};
use super::traits::{ItemFlags, ItemModel, MatchesFlags, Orientation, SortOrder, UpdateFlags};
use crate::error::{Error, Result, contract_violation};

new_key_type! {
    /// Key of a mapping in the proxy's arena.
    struct MappingId;
}

/// Case sensitivity for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaseSensitivity {
    /// Case-sensitive matching (e.g., "App" won't match "apple").
    #[default]
    CaseSensitive,
    /// Case-insensitive matching (e.g., "App" will match "apple").
    CaseInsensitive,
}

/// The visible rows under one source parent, in proxy order.
struct Mapping {
    source_parent: ModelIndex,
    rows: Vec<PersistentModelIndex>,
}

#[derive(Default)]
struct MappingTable {
    arena: SlotMap<MappingId, Mapping>,
    by_parent: HashMap<ModelIndex, MappingId>,
}

impl MappingTable {
    fn clear(&mut self) {
        self.arena.clear();
        self.by_parent.clear();
    }
}

/// Filter and sort configuration of a [`ProxyModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    /// Rows whose text does not contain this term are hidden. Empty shows
    /// every row.
    pub filter_term: String,
    /// Role whose text the filter looks at.
    pub filter_role: ItemRole,
    /// Column the filter looks at; `None` accepts a hit in any column.
    pub filter_column: Option<usize>,
    /// Case sensitivity of the filter.
    pub case_sensitivity: CaseSensitivity,
    /// Column to sort by; `None` keeps the source order.
    pub sort_column: Option<usize>,
    /// Role whose value the sort compares.
    pub sort_role: ItemRole,
    /// Direction of the sort.
    pub sort_order: SortOrder,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            filter_term: String::new(),
            filter_role: ItemRole::Display,
            filter_column: None,
            case_sensitivity: CaseSensitivity::CaseSensitive,
            sort_column: None,
            sort_role: ItemRole::Display,
            sort_order: SortOrder::Ascending,
        }
    }
}

impl ProxySettings {
    fn accepts_text(&self, text: &str) -> bool {
        match self.case_sensitivity {
            CaseSensitivity::CaseSensitive => text.contains(&self.filter_term),
            CaseSensitivity::CaseInsensitive => text
                .to_lowercase()
                .contains(&self.filter_term.to_lowercase()),
        }
    }
}

/// A proxy model that provides filtering and sorting on top of a source
/// model.
///
/// The proxy works on any `ItemModel`, flat or hierarchical. Only rows are
/// filtered and sorted; columns pass through unchanged.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use tabula::model::{ItemModel, ListModel, ModelIndex, ProxyModel, SortOrder};
///
/// let source = Arc::new(ListModel::new(vec![
///     "keep a".to_string(),
///     "skip".to_string(),
///     "keep b".to_string(),
/// ]));
/// let proxy = ProxyModel::new(source);
///
/// proxy.filter("keep");
/// assert_eq!(proxy.row_count(&ModelIndex::invalid()), 2);
///
/// proxy.sort(Some(0), SortOrder::Descending);
/// let first = proxy.index(0, 0, &ModelIndex::invalid());
/// assert_eq!(proxy.display_text(&first).as_deref(), Some("keep b"));
/// ```
pub struct ProxyModel<S: ItemModel + 'static> {
    source: Arc<S>,
    settings: RwLock<ProxySettings>,
    mappings: Mutex<MappingTable>,
    updated_connection: ConnectionId,
    data_connection: ConnectionId,
    base: ModelBase,
}

impl<S: ItemModel + 'static> ProxyModel<S> {
    /// Creates a new proxy model wrapping the given source.
    pub fn new(source: Arc<S>) -> Arc<Self> {
        Self::with_settings(source, ProxySettings::default())
    }

    /// Creates a proxy with the given initial configuration.
    pub fn with_settings(source: Arc<S>, settings: ProxySettings) -> Arc<Self> {
        Arc::new_cyclic(|weak: &std::sync::Weak<Self>| {
            let observer = weak.clone();
            let updated_connection = source.signals().model_updated.connect(move |flags| {
                if let Some(proxy) = observer.upgrade() {
                    proxy.source_did_update(*flags);
                }
            });
            let observer = weak.clone();
            let data_connection = source.signals().data_changed.connect(move |_| {
                if let Some(proxy) = observer.upgrade() {
                    proxy.source_did_update(UpdateFlags::keep_indices());
                }
            });
            Self {
                source,
                settings: RwLock::new(settings),
                mappings: Mutex::new(MappingTable::default()),
                updated_connection,
                data_connection,
                base: ModelBase::new(),
            }
        })
    }

    /// Returns a reference to the source model.
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Returns a snapshot of the current configuration.
    pub fn settings(&self) -> ProxySettings {
        self.settings.read().clone()
    }

    /// The current filter term.
    pub fn filter_term(&self) -> String {
        self.settings.read().filter_term.clone()
    }

    /// The column rows are sorted by, if any.
    pub fn sort_column(&self) -> Option<usize> {
        self.settings.read().sort_column
    }

    /// The current sort direction.
    pub fn sort_order(&self) -> SortOrder {
        self.settings.read().sort_order
    }

    /// Number of mappings currently cached.
    pub fn mapping_count(&self) -> usize {
        self.mappings.lock().arena.len()
    }

    /// Shows only the rows whose text contains `term`.
    ///
    /// Does nothing if the term is unchanged.
    pub fn filter(&self, term: impl Into<String>) {
        let term = term.into();
        if self.update_settings(|settings| replace(&mut settings.filter_term, term)) {
            self.refilter();
        }
    }

    /// Sets the role the filter looks at.
    pub fn set_filter_role(&self, role: ItemRole) {
        if self.update_settings(|settings| replace(&mut settings.filter_role, role)) {
            self.refilter();
        }
    }

    /// Sets the column the filter looks at (`None` for any column).
    pub fn set_filter_column(&self, column: Option<usize>) {
        if self.update_settings(|settings| replace(&mut settings.filter_column, column)) {
            self.refilter();
        }
    }

    /// Sets the case sensitivity of the filter.
    pub fn set_case_sensitivity(&self, sensitivity: CaseSensitivity) {
        if self.update_settings(|settings| replace(&mut settings.case_sensitivity, sensitivity)) {
            self.refilter();
        }
    }

    /// Sets the role the sort compares.
    pub fn set_sort_role(&self, role: ItemRole) {
        if self.update_settings(|settings| replace(&mut settings.sort_role, role)) {
            self.resort();
        }
    }

    /// Maps a proxy index to the corresponding source index.
    ///
    /// An invalid proxy index maps to the invalid (root) source index.
    pub fn try_map_to_source(&self, proxy_index: &ModelIndex) -> Result<ModelIndex> {
        if !proxy_index.is_valid() {
            return Ok(ModelIndex::invalid());
        }
        let key = mapping_key(proxy_index)?;

        let (source_parent, reference) = {
            let table = self.mappings.lock();
            let mapping = table.arena.get(key).ok_or_else(Error::stale_index)?;
            let reference = mapping
                .rows
                .get(proxy_index.row())
                .cloned()
                .ok_or_else(|| Error::row_out_of_range(proxy_index.row(), mapping.rows.len()))?;
            (mapping.source_parent.clone(), reference)
        };

        let row = reference.row().ok_or_else(Error::stale_index)?;
        Ok(self.source.index(row, proxy_index.column(), &source_parent))
    }

    /// Maps a proxy index to the corresponding source index, or an invalid
    /// index if it cannot be resolved.
    pub fn map_to_source(&self, proxy_index: &ModelIndex) -> ModelIndex {
        self.try_map_to_source(proxy_index).unwrap_or_else(|error| {
            tracing::debug!(target: targets::PROXY, %error, "unresolvable proxy index");
            ModelIndex::invalid()
        })
    }

    /// Maps a source index to the corresponding proxy index.
    ///
    /// Returns an invalid index if the row (or one of its ancestors) is
    /// filtered out.
    pub fn map_from_source(&self, source_index: &ModelIndex) -> ModelIndex {
        if !source_index.is_valid() {
            return ModelIndex::invalid();
        }

        // Builds the whole ancestor chain of mappings before recursing.
        let source_parent = self.source.parent(source_index);
        let Some(key) = self.mapping_for(&source_parent) else {
            return ModelIndex::invalid();
        };
        let proxy_parent = self.map_from_source(&source_parent);
        if source_parent.is_valid() && !proxy_parent.is_valid() {
            return ModelIndex::invalid();
        }

        let table = self.mappings.lock();
        let Some(mapping) = table.arena.get(key) else {
            return ModelIndex::invalid();
        };
        let source_row = Some(source_index.row());
        match mapping.rows.iter().position(|r| r.row() == source_row) {
            Some(row) => ModelIndex::with_internal_id(
                row,
                source_index.column(),
                proxy_parent,
                key.data().as_ffi(),
            ),
            None => ModelIndex::invalid(),
        }
    }

    /// Resolves a proxy index handed in by a caller, which must have been
    /// vended by this proxy and still be current.
    #[track_caller]
    fn expect_source(&self, proxy_index: &ModelIndex) -> ModelIndex {
        match self.try_map_to_source(proxy_index) {
            Ok(index) => index,
            Err(error) => contract_violation(error),
        }
    }

    /// Resolves a proxy parent to a source parent. `None` if a valid proxy
    /// parent no longer resolves.
    fn source_parent_of(&self, proxy_parent: &ModelIndex) -> Option<ModelIndex> {
        let source_parent = self.map_to_source(proxy_parent);
        if proxy_parent.is_valid() && !source_parent.is_valid() {
            return None;
        }
        Some(source_parent)
    }

    /// Returns the mapping for `source_parent`, building it on first use.
    ///
    /// Observers hear about new mappings once per outermost call.
    fn mapping_for(&self, source_parent: &ModelIndex) -> Option<MappingId> {
        let (key, created) = self.get_or_create_mapping(source_parent)?;
        if created {
            self.base.notify_updated(UpdateFlags::cache_extended());
        }
        Some(key)
    }

    fn get_or_create_mapping(&self, source_parent: &ModelIndex) -> Option<(MappingId, bool)> {
        if let Some(&key) = self.mappings.lock().by_parent.get(source_parent) {
            return Some((key, false));
        }

        if source_parent.is_valid() {
            let grandparent = self.source.parent(source_parent);
            self.get_or_create_mapping(&grandparent)?;
        }

        let settings = self.settings();
        let rows = self.build_rows(source_parent, &settings);

        let mut table = self.mappings.lock();
        if let Some(&key) = table.by_parent.get(source_parent) {
            return Some((key, false));
        }
        let key = table.arena.insert(Mapping {
            source_parent: source_parent.clone(),
            rows,
        });
        table.by_parent.insert(source_parent.clone(), key);
        Some((key, true))
    }

    /// Pulls the children of `source_parent` from the source, filters and
    /// sorts them.
    fn build_rows(&self, source_parent: &ModelIndex, settings: &ProxySettings) -> Vec<PersistentModelIndex> {
        let _span = PerfSpan::new("build_proxy_mapping");
        let count = self.source.row_count(source_parent);
        let mut rows: Vec<PersistentModelIndex> = (0..count)
            .map(|row| self.source.index(row, 0, source_parent))
            .filter(|index| index.is_valid() && self.accepts_row(index, source_parent, settings))
            .map(|index| self.source.persistent_index(&index))
            .collect();
        self.sort_rows(&mut rows, source_parent, settings);

        tracing::debug!(
            target: targets::PROXY,
            source_rows = count,
            visible_rows = rows.len(),
            depth = source_parent.depth(),
            "built mapping"
        );
        rows
    }

    fn accepts_row(&self, index: &ModelIndex, source_parent: &ModelIndex, settings: &ProxySettings) -> bool {
        if settings.filter_term.is_empty() {
            return true;
        }
        let columns = match settings.filter_column {
            Some(column) => column..column + 1,
            None => 0..self.source.column_count(source_parent),
        };
        columns.into_iter().any(|column| {
            let cell = self.source.index(index.row(), column, source_parent);
            self.source
                .data(&cell, settings.filter_role)
                .to_text()
                .is_some_and(|text| settings.accepts_text(&text))
        })
    }

    fn sort_rows(&self, rows: &mut Vec<PersistentModelIndex>, source_parent: &ModelIndex, settings: &ProxySettings) {
        let Some(column) = settings.sort_column else {
            rows.sort_by_key(|r| r.row());
            return;
        };

        let mut keyed: Vec<(ItemData, Option<usize>, PersistentModelIndex)> = rows
            .drain(..)
            .map(|reference| {
                let row = reference.row();
                let value = match row {
                    Some(row) => {
                        let cell = self.source.index(row, column, source_parent);
                        self.source.data(&cell, settings.sort_role)
                    }
                    None => ItemData::None,
                };
                (value, row, reference)
            })
            .collect();

        keyed.sort_by(|(a, row_a, _), (b, row_b, _)| {
            let ordering = a.sort_cmp(b);
            let ordering = match settings.sort_order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            };
            ordering.then_with(|| row_a.cmp(row_b))
        });
        rows.extend(keyed.into_iter().map(|(_, _, reference)| reference));
    }

    /// Applies a settings change; returns `true` if anything changed.
    fn update_settings(&self, change: impl FnOnce(&mut ProxySettings) -> bool) -> bool {
        change(&mut self.settings.write())
    }

    fn cached_parents(&self) -> Vec<(MappingId, ModelIndex)> {
        self.mappings
            .lock()
            .arena
            .iter()
            .map(|(key, mapping)| (key, mapping.source_parent.clone()))
            .collect()
    }

    /// Rebuilds every cached mapping from the source under the current
    /// filter, so rows hidden by an earlier term can come back.
    fn refilter(&self) {
        let settings = self.settings();
        for (key, source_parent) in self.cached_parents() {
            let rows = self.build_rows(&source_parent, &settings);
            if let Some(mapping) = self.mappings.lock().arena.get_mut(key) {
                mapping.rows = rows;
            }
        }
        tracing::debug!(target: targets::PROXY, term = %settings.filter_term, "refiltered");
        self.base.notify_updated(UpdateFlags::keep_indices());
    }

    /// Re-sorts every cached mapping in place.
    fn resort(&self) {
        let settings = self.settings();
        for (key, source_parent) in self.cached_parents() {
            let Some(mut rows) = self
                .mappings
                .lock()
                .arena
                .get(key)
                .map(|mapping| mapping.rows.clone())
            else {
                continue;
            };
            self.sort_rows(&mut rows, &source_parent, &settings);
            if let Some(mapping) = self.mappings.lock().arena.get_mut(key) {
                mapping.rows = rows;
            }
        }
        tracing::debug!(
            target: targets::PROXY,
            column = ?settings.sort_column,
            order = ?settings.sort_order,
            "resorted"
        );
        self.base.notify_updated(UpdateFlags::keep_indices());
    }

    /// Drops every mapping after the source changed, unless the source
    /// only built tables of its own.
    fn source_did_update(&self, flags: UpdateFlags) {
        if flags.cache_only {
            tracing::trace!(target: targets::PROXY, "source extended its cache");
            return;
        }
        self.mappings.lock().clear();
        if flags.invalidate_indices {
            self.base.clear_persistent_indices();
        }
        tracing::debug!(
            target: targets::PROXY,
            invalidate_indices = flags.invalidate_indices,
            "source updated, mappings dropped"
        );
        self.base.notify_updated(flags);
    }
}

impl<S: ItemModel + 'static> Drop for ProxyModel<S> {
    fn drop(&mut self) {
        let signals = self.source.signals();
        signals.model_updated.disconnect(self.updated_connection);
        signals.data_changed.disconnect(self.data_connection);
    }
}

impl<S: ItemModel + 'static> ItemModel for ProxyModel<S> {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        let Some(source_parent) = self.source_parent_of(parent) else {
            return 0;
        };
        let Some(key) = self.mapping_for(&source_parent) else {
            return 0;
        };
        self.mappings
            .lock()
            .arena
            .get(key)
            .map_or(0, |mapping| mapping.rows.len())
    }

    fn column_count(&self, parent: &ModelIndex) -> usize {
        self.source_parent_of(parent)
            .map_or(0, |source_parent| self.source.column_count(&source_parent))
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        if !index.is_valid() {
            return ItemData::None;
        }
        let source_index = self.expect_source(index);
        self.source.data(&source_index, role)
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        let Some(source_parent) = self.source_parent_of(parent) else {
            return ModelIndex::invalid();
        };
        if column >= self.source.column_count(&source_parent) {
            return ModelIndex::invalid();
        }
        let Some(key) = self.mapping_for(&source_parent) else {
            return ModelIndex::invalid();
        };

        let table = self.mappings.lock();
        match table.arena.get(key) {
            Some(mapping) if row < mapping.rows.len() => {
                ModelIndex::with_internal_id(row, column, parent.clone(), key.data().as_ffi())
            }
            _ => ModelIndex::invalid(),
        }
    }

    fn parent(&self, index: &ModelIndex) -> ModelIndex {
        if !index.is_valid() {
            return ModelIndex::invalid();
        }
        let Ok(key) = mapping_key(index) else {
            return ModelIndex::invalid();
        };
        let source_parent = match self.mappings.lock().arena.get(key) {
            Some(mapping) => mapping.source_parent.clone(),
            None => return ModelIndex::invalid(),
        };
        self.map_from_source(&source_parent)
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn set_data(&self, index: &ModelIndex, value: ItemData, role: ItemRole) -> bool {
        let source_index = self.expect_source(index);
        self.source.set_data(&source_index, value, role)
    }

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        let source_index = self.map_to_source(index);
        if index.is_valid() && !source_index.is_valid() {
            return ItemFlags::disabled();
        }
        self.source.flags(&source_index)
    }

    fn is_editable(&self, index: &ModelIndex) -> bool {
        let source_index = self.map_to_source(index);
        source_index.is_valid() && self.source.is_editable(&source_index)
    }

    fn header_data(&self, section: usize, orientation: Orientation, role: ItemRole) -> ItemData {
        self.source.header_data(section, orientation, role)
    }

    fn column_name(&self, column: usize) -> String {
        self.source.column_name(column)
    }

    fn tree_column(&self) -> usize {
        self.source.tree_column()
    }

    fn accepts_drag(&self, index: &ModelIndex, mime_types: &[&str]) -> bool {
        let source_index = self.map_to_source(index);
        source_index.is_valid() && self.source.accepts_drag(&source_index, mime_types)
    }

    fn is_searchable(&self) -> bool {
        self.source.is_searchable()
    }

    fn is_column_sortable(&self, column: usize) -> bool {
        self.source.is_column_sortable(column)
    }

    fn data_matches(&self, index: &ModelIndex, value: &ItemData) -> TriState {
        let source_index = self.expect_source(index);
        self.source.data_matches(&source_index, value)
    }

    fn matches(&self, term: &str, flags: MatchesFlags, parent: &ModelIndex) -> Vec<ModelIndex> {
        let Some(source_parent) = self.source_parent_of(parent) else {
            return Vec::new();
        };
        self.source
            .matches(term, flags, &source_parent)
            .iter()
            .map(|found| self.map_from_source(found))
            .filter(ModelIndex::is_valid)
            .collect()
    }

    /// Sorts the proxy rows by `column` (`None` restores the source order).
    ///
    /// Does nothing if neither the column nor the order changed.
    fn sort(&self, column: Option<usize>, order: SortOrder) {
        let changed = self.update_settings(|settings| {
            let column_changed = replace(&mut settings.sort_column, column);
            let order_changed = replace(&mut settings.sort_order, order);
            column_changed || order_changed
        });
        if changed {
            self.resort();
        }
    }

    /// Invalidates the source, then drops every mapping and every
    /// persistent index of the proxy.
    fn invalidate(&self) {
        self.source.invalidate();
        self.mappings.lock().clear();
        self.base.invalidate();
    }
}

/// Builder pattern for creating proxy models.
pub struct ProxyModelBuilder<S: ItemModel> {
    source: Arc<S>,
    settings: ProxySettings,
}

impl<S: ItemModel + 'static> ProxyModelBuilder<S> {
    /// Creates a new builder with the given source model.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            settings: ProxySettings::default(),
        }
    }

    /// Sets the initial filter term.
    pub fn filter(mut self, term: impl Into<String>) -> Self {
        self.settings.filter_term = term.into();
        self
    }

    /// Sets the role the filter looks at.
    pub fn filter_role(mut self, role: ItemRole) -> Self {
        self.settings.filter_role = role;
        self
    }

    /// Restricts the filter to one column.
    pub fn filter_column(mut self, column: usize) -> Self {
        self.settings.filter_column = Some(column);
        self
    }

    /// Sets the case sensitivity of the filter.
    pub fn case_sensitivity(mut self, sensitivity: CaseSensitivity) -> Self {
        self.settings.case_sensitivity = sensitivity;
        self
    }

    /// Sets the initial sort.
    pub fn sort(mut self, column: usize, order: SortOrder) -> Self {
        self.settings.sort_column = Some(column);
        self.settings.sort_order = order;
        self
    }

    /// Sets the role the sort compares.
    pub fn sort_role(mut self, role: ItemRole) -> Self {
        self.settings.sort_role = role;
        self
    }

    /// Builds the proxy model.
    pub fn build(self) -> Arc<ProxyModel<S>> {
        ProxyModel::with_settings(self.source, self.settings)
    }
}

/// Stores `value` in `slot`; returns `true` if it differed.
fn replace<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Recovers the mapping key stored in a proxy index.
#[track_caller]
fn mapping_key(proxy_index: &ModelIndex) -> Result<MappingId> {
    // Occupied slot map keys always carry a non-zero version.
    if proxy_index.internal_id() == 0 {
        return Err(Error::foreign_index());
    }
    Ok(MappingId::from(KeyData::from_ffi(proxy_index.internal_id())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListItem, ListModel, TreeModel};
    use parking_lot::Mutex;

    fn root() -> ModelIndex {
        ModelIndex::invalid()
    }

    fn source(items: &[&str]) -> Arc<ListModel<String>> {
        Arc::new(ListModel::new(items.iter().map(|s| s.to_string()).collect()))
    }

    fn texts<M: ItemModel>(model: &M, parent: &ModelIndex) -> Vec<String> {
        (0..model.row_count(parent))
            .filter_map(|row| model.display_text(&model.index(row, 0, parent)))
            .collect()
    }

    struct Person {
        name: String,
        age: i64,
    }

    impl ListItem for Person {
        fn display(&self) -> ItemData {
            ItemData::from(self.name.as_str())
        }

        fn data(&self, role: ItemRole) -> ItemData {
            match role {
                ItemRole::Sort => ItemData::from(self.age),
                _ => ItemData::None,
            }
        }
    }

    #[test]
    fn test_passthrough() {
        let proxy = ProxyModel::new(source(&["a", "b", "c"]));
        assert_eq!(proxy.row_count(&root()), 3);
        assert_eq!(proxy.column_count(&root()), 1);
        assert_eq!(texts(&*proxy, &root()), vec!["a", "b", "c"]);
        assert!(!proxy.index(3, 0, &root()).is_valid());
        assert!(!proxy.index(0, 1, &root()).is_valid());
    }

    #[test]
    fn test_filter_hides_rows() {
        let proxy = ProxyModel::new(source(&["keep a", "skip", "keep b"]));
        proxy.filter("keep");

        assert_eq!(proxy.row_count(&root()), 2);
        let second = proxy.index(1, 0, &root());
        assert_eq!(proxy.map_to_source(&second).row(), 2);
        assert_eq!(proxy.display_text(&second).as_deref(), Some("keep b"));
    }

    #[test]
    fn test_filter_can_show_rows_again() {
        let proxy = ProxyModel::new(source(&["keep a", "skip", "keep b"]));
        assert_eq!(proxy.row_count(&root()), 3);
        proxy.filter("skip");
        assert_eq!(texts(&*proxy, &root()), vec!["skip"]);
        proxy.filter("");
        assert_eq!(texts(&*proxy, &root()), vec!["keep a", "skip", "keep b"]);
    }

    #[test]
    fn test_case_sensitivity() {
        let proxy = ProxyModel::new(source(&["Apple", "apricot", "banana"]));
        proxy.filter("ap");
        assert_eq!(texts(&*proxy, &root()), vec!["apricot"]);

        proxy.set_case_sensitivity(CaseSensitivity::CaseInsensitive);
        assert_eq!(texts(&*proxy, &root()), vec!["Apple", "apricot"]);
    }

    #[test]
    fn test_sort_and_restore() {
        let proxy = ProxyModel::new(source(&["pear", "Apple", "fig"]));
        proxy.sort(Some(0), SortOrder::Ascending);
        assert_eq!(texts(&*proxy, &root()), vec!["Apple", "fig", "pear"]);

        proxy.sort(Some(0), SortOrder::Descending);
        assert_eq!(texts(&*proxy, &root()), vec!["pear", "fig", "Apple"]);
        assert_eq!(proxy.sort_order(), SortOrder::Descending);

        proxy.sort(None, SortOrder::Descending);
        assert_eq!(texts(&*proxy, &root()), vec!["pear", "Apple", "fig"]);
    }

    #[test]
    fn test_sort_role() {
        let people = Arc::new(ListModel::new(vec![
            Person { name: "Ann".into(), age: 40 },
            Person { name: "Bob".into(), age: 9 },
            Person { name: "Cy".into(), age: 25 },
        ]));
        let proxy = ProxyModelBuilder::new(people)
            .sort(0, SortOrder::Ascending)
            .sort_role(ItemRole::Sort)
            .build();
        assert_eq!(texts(&*proxy, &root()), vec!["Bob", "Cy", "Ann"]);

        proxy.set_sort_role(ItemRole::Display);
        assert_eq!(texts(&*proxy, &root()), vec!["Ann", "Bob", "Cy"]);
    }

    #[test]
    fn test_unchanged_parameters_do_not_notify() {
        let proxy = ProxyModel::new(source(&["a", "b"]));
        proxy.row_count(&root());

        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        proxy.signals().model_updated.connect(move |flags| sink.lock().push(*flags));

        proxy.filter("");
        proxy.sort(None, SortOrder::Ascending);
        assert!(updates.lock().is_empty());

        proxy.filter("a");
        assert_eq!(*updates.lock(), vec![UpdateFlags::keep_indices()]);
    }

    #[test]
    fn test_lazy_mapping_notifies_once() {
        let tree = Arc::new(TreeModel::<String>::new());
        let docs = tree.add_root("docs".into());
        let inner = tree.add_child(docs, "inner".into()).unwrap();
        tree.add_child(inner, "leaf".into()).unwrap();
        let proxy = ProxyModel::new(tree.clone());

        let updates = Arc::new(Mutex::new(0));
        let sink = updates.clone();
        proxy.signals().model_updated.connect(move |_| *sink.lock() += 1);

        // Resolving the leaf's parent chain creates three mappings at once.
        let leaf = proxy.map_from_source(&tree.index(0, 0, &tree.index_for_node(inner)));
        assert!(leaf.is_valid());
        assert_eq!(proxy.mapping_count(), 3);
        assert_eq!(*updates.lock(), 1);
    }

    #[test]
    fn test_tree_navigation() {
        let tree = Arc::new(TreeModel::<String>::new());
        let fruit = tree.add_root("fruit".into());
        tree.add_child(fruit, "pear".into()).unwrap();
        tree.add_child(fruit, "apple".into()).unwrap();
        tree.add_root("veg".into());

        let proxy = ProxyModel::new(tree.clone());
        proxy.sort(Some(0), SortOrder::Ascending);

        let fruit_proxy = proxy.index(0, 0, &root());
        assert_eq!(texts(&*proxy, &fruit_proxy), vec!["apple", "pear"]);

        let apple = proxy.index(0, 0, &fruit_proxy);
        assert_eq!(proxy.parent(&apple), fruit_proxy);
        assert_eq!(proxy.map_to_source(&apple), tree.index(1, 0, &tree.index_for_node(fruit)));
        assert_eq!(proxy.map_from_source(&proxy.map_to_source(&apple)), apple);
    }

    #[test]
    fn test_source_edit_drops_mappings() {
        let list = source(&["b", "a"]);
        let proxy = ProxyModel::new(list.clone());
        proxy.sort(Some(0), SortOrder::Ascending);
        assert_eq!(texts(&*proxy, &root()), vec!["a", "b"]);
        assert_eq!(proxy.mapping_count(), 1);

        list.push("0".into());
        assert_eq!(proxy.mapping_count(), 0);
        assert_eq!(texts(&*proxy, &root()), vec!["0", "a", "b"]);
    }

    #[test]
    fn test_stale_index_is_detected() {
        let list = source(&["a", "b"]);
        let proxy = ProxyModel::new(list.clone());
        let stale = proxy.index(1, 0, &root());

        list.push("c".into());

        assert_eq!(proxy.try_map_to_source(&stale), Err(Error::StaleIndex));
        assert!(!proxy.map_to_source(&stale).is_valid());
        assert!(!proxy.is_editable(&stale));
    }

    #[test]
    fn test_foreign_index_is_rejected() {
        let proxy = ProxyModel::new(source(&["a"]));
        let foreign = ModelIndex::new(0, 0, root());
        assert_eq!(proxy.try_map_to_source(&foreign), Err(Error::ForeignIndex));
    }

    #[test]
    #[should_panic(expected = "model contract violated")]
    fn test_data_on_stale_index_panics() {
        let list = source(&["a"]);
        let proxy = ProxyModel::new(list.clone());
        let stale = proxy.index(0, 0, &root());
        list.clear();
        proxy.data(&stale, ItemRole::Display);
    }

    #[test]
    fn test_set_data_reaches_source() {
        let list = source(&["a"]);
        let proxy = ProxyModel::new(list.clone());
        let index = proxy.index(0, 0, &root());
        assert!(proxy.is_editable(&index));
        assert!(proxy.set_data(&index, ItemData::from("z"), ItemRole::Edit));
        assert_eq!(list.items()[0], "z");
    }

    #[test]
    fn test_edit_through_proxy_resorts() {
        let list = source(&["a", "b", "c"]);
        let proxy = ProxyModel::new(list.clone());
        proxy.sort(Some(0), SortOrder::Ascending);
        assert_eq!(texts(&*proxy, &root()), vec!["a", "b", "c"]);

        let first = proxy.index(0, 0, &root());
        assert!(proxy.set_data(&first, ItemData::from("z"), ItemRole::Edit));

        assert_eq!(texts(&*proxy, &root()), vec!["b", "c", "z"]);
    }

    #[test]
    fn test_source_data_edit_refilters() {
        let list = source(&["keep a", "keep b"]);
        let proxy = ProxyModel::new(list.clone());
        proxy.filter("keep");
        assert_eq!(proxy.row_count(&root()), 2);

        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        proxy.signals().model_updated.connect(move |flags| sink.lock().push(*flags));

        list.set_data(&list.index(0, 0, &root()), ItemData::from("drop"), ItemRole::Edit);

        assert_eq!(updates.lock().first(), Some(&UpdateFlags::keep_indices()));
        assert_eq!(texts(&*proxy, &root()), vec!["keep b"]);
    }

    #[test]
    fn test_tree_node_edit_refilters() {
        let tree = Arc::new(TreeModel::<String>::new());
        let top = tree.add_root("top".into());
        let kept = tree.add_child(top, "apple".into()).unwrap();
        tree.add_child(top, "apricot".into()).unwrap();
        let proxy = ProxyModel::new(tree.clone());
        proxy.filter("p");

        let top_proxy = proxy.index(0, 0, &root());
        assert_eq!(texts(&*proxy, &top_proxy), vec!["apple", "apricot"]);

        tree.modify_node(kept, |name| *name = "banana".into());

        let top_proxy = proxy.index(0, 0, &root());
        assert_eq!(texts(&*proxy, &top_proxy), vec!["apricot"]);
    }

    #[test]
    fn test_stacked_proxy_survives_lazy_builds() {
        let tree = Arc::new(TreeModel::<String>::new());
        let top = tree.add_root("top".into());
        let inner = tree.add_child(top, "inner".into()).unwrap();
        tree.add_child(inner, "leaf".into()).unwrap();

        let lower = ProxyModel::new(tree.clone());
        let upper = ProxyModel::new(lower.clone());
        let held = upper.index(0, 0, &root());
        assert!(held.is_valid());

        // Walking down builds new mappings in both proxies.
        let inner_proxy = upper.index(0, 0, &held);
        let leaf = upper.index(0, 0, &inner_proxy);
        assert_eq!(upper.display_text(&leaf).as_deref(), Some("leaf"));

        assert_eq!(upper.mapping_count(), 3);
        assert!(upper.try_map_to_source(&held).is_ok());
    }

    #[test]
    fn test_matches_skips_hidden_rows() {
        let proxy = ProxyModel::new(source(&["alpha", "beta", "alps"]));
        proxy.filter("s");
        let found = proxy.matches("al", MatchesFlags::default(), &root());
        assert_eq!(found.len(), 1);
        assert_eq!(proxy.display_text(&found[0]).as_deref(), Some("alps"));
    }

    #[test]
    fn test_resort_keeps_proxy_persistent_indices() {
        let proxy = ProxyModel::new(source(&["b", "a"]));
        let held = proxy.persistent_index(&proxy.index(0, 0, &root()));
        proxy.sort(Some(0), SortOrder::Ascending);
        assert!(held.is_valid());
    }

    #[test]
    fn test_invalidate() {
        let list = source(&["a"]);
        let proxy = ProxyModel::new(list.clone());
        let held_source = list.persistent_index(&list.index(0, 0, &root()));
        let held_proxy = proxy.persistent_index(&proxy.index(0, 0, &root()));

        proxy.invalidate();

        assert!(!held_source.is_valid());
        assert!(!held_proxy.is_valid());
        assert_eq!(proxy.mapping_count(), 0);
        assert_eq!(proxy.row_count(&root()), 1);
    }

    #[test]
    fn test_drop_disconnects() {
        let list = source(&["a"]);
        let proxy = ProxyModel::new(list.clone());
        assert_eq!(list.signals().model_updated.connection_count(), 1);
        assert_eq!(list.signals().data_changed.connection_count(), 1);
        drop(proxy);
        assert_eq!(list.signals().model_updated.connection_count(), 0);
        assert_eq!(list.signals().data_changed.connection_count(), 0);
    }
}
