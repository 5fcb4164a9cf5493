//! A tree of nodes exposed as an [`ItemModel`].
//!
//! Every index a [`TreeModel`] hands out carries its node id as the internal
//! id, so a persistent index taken on a node still names that node after it
//! moves under another parent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::base::ModelBase;
use super::index::ModelIndex;
use super::role::{ItemData, ItemRole};
use super::traits::{ItemFlags, ItemModel};

/// Identifier of a tree node. Ids are never reused within a process.
pub type NodeId = u64;

static NEXT_NODE: AtomicU64 = AtomicU64::new(1);

/// Payload of a tree node.
///
/// Only `display` is required. Column 0 answers `Display` and `ToolTip`
/// through the dedicated methods and every other role through `data`; later
/// columns go to `column_data`.
pub trait TreeNodeData: Send + Sync {
    fn display(&self) -> ItemData;

    fn tooltip(&self) -> ItemData {
        ItemData::None
    }

    fn data(&self, _role: ItemRole) -> ItemData {
        ItemData::None
    }

    fn column_data(&self, _column: usize, _role: ItemRole) -> ItemData {
        ItemData::None
    }

    fn flags(&self) -> ItemFlags {
        ItemFlags::new()
    }
}

impl TreeNodeData for String {
    fn display(&self) -> ItemData {
        ItemData::String(self.clone())
    }
}

struct Node<T> {
    data: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Node table plus the ordered list of top-level nodes.
struct Forest<T> {
    nodes: HashMap<NodeId, Node<T>>,
    roots: Vec<NodeId>,
}

impl<T> Forest<T> {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            roots: Vec::new(),
        }
    }

    fn siblings(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            None => &self.roots,
            Some(id) => self.nodes.get(&id).map_or(&[][..], |node| node.children.as_slice()),
        }
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> Option<&mut Vec<NodeId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(id) => self.nodes.get_mut(&id).map(|node| &mut node.children),
        }
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id)?.parent
    }

    fn row_of(&self, id: NodeId) -> Option<usize> {
        self.siblings(self.parent_of(id))
            .iter()
            .position(|&sibling| sibling == id)
    }

    fn insert(&mut self, parent: Option<NodeId>, row: usize, data: T) -> Option<NodeId> {
        let id = NEXT_NODE.fetch_add(1, Ordering::Relaxed);
        self.siblings_mut(parent)?.insert(row, id);
        let children = Vec::new();
        self.nodes.insert(id, Node { data, parent, children });
        Some(id)
    }

    fn detach(&mut self, id: NodeId) {
        let parent = self.parent_of(id);
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.retain(|&sibling| sibling != id);
        }
    }

    /// Unlinks `id` and drops its whole subtree, returning the node's data.
    fn remove(&mut self, id: NodeId) -> Option<T> {
        self.detach(id);
        let node = self.nodes.remove(&id)?;
        let mut pending = node.children;
        while let Some(descendant) = pending.pop() {
            if let Some(removed) = self.nodes.remove(&descendant) {
                pending.extend(removed.children);
            }
        }
        Some(node.data)
    }

    /// Moves `id` under `parent`; `row` counts siblings after the unlink.
    fn reparent(&mut self, id: NodeId, parent: Option<NodeId>, row: usize) {
        self.detach(id);
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.insert(row, id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = parent;
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        std::iter::successors(self.parent_of(id), |&node| self.parent_of(node))
            .any(|node| node == ancestor)
    }

    /// Column-0 index of `id`, parent chain included.
    fn index_for(&self, id: NodeId) -> Option<ModelIndex> {
        let row = self.row_of(id)?;
        let parent = match self.parent_of(id) {
            Some(parent) => self.index_for(parent)?,
            None => ModelIndex::invalid(),
        };
        Some(ModelIndex::with_internal_id(row, 0, parent, id))
    }
}

/// A hierarchical model of [`TreeNodeData`] nodes.
///
/// Every edit goes through the model's edit brackets, so persistent indices
/// follow nodes through inserts, removals and moves.
///
/// ```
/// use tabula::model::{ItemModel, TreeModel};
///
/// let model = TreeModel::<String>::new();
/// let docs = model.add_root("Documents".into());
/// let file = model.add_child(docs, "file.txt".into()).unwrap();
///
/// let held = model.persistent_index(&model.index_for_node(file));
/// let archive = model.add_root("Archive".into());
/// model.move_node(file, Some(archive), 0);
/// assert_eq!(held.parent(), model.index_for_node(archive));
/// ```
pub struct TreeModel<T> {
    forest: RwLock<Forest<T>>,
    column_count: usize,
    base: ModelBase,
}

impl<T: TreeNodeData + 'static> TreeModel<T> {
    pub fn new() -> Self {
        Self::with_column_count(1)
    }

    /// An empty tree whose rows have `count` columns.
    pub fn with_column_count(count: usize) -> Self {
        Self {
            forest: RwLock::new(Forest::new()),
            column_count: count,
            base: ModelBase::new(),
        }
    }

    pub fn set_column_count(&mut self, count: usize) {
        self.column_count = count;
    }

    /// Appends a top-level node.
    pub fn add_root(&self, data: T) -> NodeId {
        let row = self.root_count();
        self.begin_insert_rows(&ModelIndex::invalid(), row, row);
        let id = self.forest.write().insert(None, row, data);
        self.end_insert_rows();
        // The root sibling list always exists.
        id.unwrap_or_default()
    }

    /// Appends a node under `parent`. `None` if `parent` is unknown.
    pub fn add_child(&self, parent: NodeId, data: T) -> Option<NodeId> {
        let row = self.forest.read().siblings(Some(parent)).len();
        self.insert_child(Some(parent), row, data)
    }

    /// Inserts a node at `row` under `parent` (`None` for top level).
    /// `None` if `parent` is unknown.
    ///
    /// # Panics
    ///
    /// Panics if `row` is past the end of the parent's children.
    pub fn insert_child(&self, parent: Option<NodeId>, row: usize, data: T) -> Option<NodeId> {
        let parent_index = match parent {
            Some(parent) => self.forest.read().index_for(parent)?,
            None => ModelIndex::invalid(),
        };
        self.begin_insert_rows(&parent_index, row, row);
        let id = self.forest.write().insert(parent, row, data);
        self.end_insert_rows();
        id
    }

    /// Removes a node with its subtree and returns the node's data.
    pub fn remove(&self, id: NodeId) -> Option<T> {
        let index = self.forest.read().index_for(id)?;
        self.begin_delete_rows(&index.parent(), index.row(), index.row());
        let data = self.forest.write().remove(id);
        self.end_delete_rows();
        data
    }

    /// Moves a node and its subtree so that it sits at `row` under
    /// `new_parent` (`None` for top level).
    ///
    /// Within one parent `row` counts the final order; across parents it is
    /// the insertion row among the new parent's current children. Returns
    /// `false` for unknown nodes and for a move into the node's own subtree.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of range for the new parent.
    pub fn move_node(&self, id: NodeId, new_parent: Option<NodeId>, row: usize) -> bool {
        let (index, target_parent) = {
            let forest = self.forest.read();
            let Some(index) = forest.index_for(id) else {
                return false;
            };
            let target_parent = match new_parent {
                None => ModelIndex::invalid(),
                Some(parent) if parent == id || forest.is_ancestor(id, parent) => return false,
                Some(parent) => match forest.index_for(parent) {
                    Some(parent_index) => parent_index,
                    None => return false,
                },
            };
            (index, target_parent)
        };

        self.begin_move_rows(&index.parent(), index.row(), index.row(), &target_parent, row);
        self.forest.write().reparent(id, new_parent, row);
        self.end_move_rows();
        true
    }

    /// Drops every node. All persistent indices become invalid.
    pub fn clear(&self) {
        self.begin_model_reset();
        *self.forest.write() = Forest::new();
        self.end_model_reset();
    }

    pub fn root_count(&self) -> usize {
        self.forest.read().roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forest.read().nodes.is_empty()
    }

    /// Runs `f` on a node's data.
    pub fn with_node<F, R>(&self, id: NodeId, f: F) -> Option<R>
    where
        F: FnOnce(&T) -> R,
    {
        self.forest.read().nodes.get(&id).map(|node| f(&node.data))
    }

    /// Runs `f` on a node's data, then emits `data_changed` for the node.
    pub fn modify_node<F, R>(&self, id: NodeId, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let (result, index) = {
            let mut forest = self.forest.write();
            let result = f(&mut forest.nodes.get_mut(&id)?.data);
            (result, forest.index_for(id)?)
        };
        self.signals()
            .emit_data_changed_single(index, vec![ItemRole::Display]);
        Some(result)
    }

    /// Current index of a node; invalid if the node is gone.
    pub fn index_for_node(&self, id: NodeId) -> ModelIndex {
        self.forest.read().index_for(id).unwrap_or_default()
    }

    /// The node behind an index of this model.
    pub fn node_for_index(&self, index: &ModelIndex) -> Option<NodeId> {
        let id = index.internal_id();
        (index.is_valid() && self.forest.read().nodes.contains_key(&id)).then_some(id)
    }

    /// Only column-0 cells have children.
    fn owns_children(parent: &ModelIndex) -> bool {
        !parent.is_valid() || parent.column() == 0
    }

    /// Node whose children live under `parent`; `None` for the root.
    fn owner(parent: &ModelIndex) -> Option<NodeId> {
        parent.is_valid().then(|| parent.internal_id())
    }
}

impl<T: TreeNodeData + 'static> Default for TreeModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TreeNodeData + 'static> ItemModel for TreeModel<T> {
    fn row_count(&self, parent: &ModelIndex) -> usize {
        if !Self::owns_children(parent) {
            return 0;
        }
        self.forest.read().siblings(Self::owner(parent)).len()
    }

    fn column_count(&self, _parent: &ModelIndex) -> usize {
        self.column_count
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        if !index.is_valid() {
            return ItemData::None;
        }
        let forest = self.forest.read();
        let Some(node) = forest.nodes.get(&index.internal_id()) else {
            return ItemData::None;
        };
        match (index.column(), role) {
            (0, ItemRole::Display) => node.data.display(),
            (0, ItemRole::ToolTip) => node.data.tooltip(),
            (0, role) => node.data.data(role),
            (column, role) => node.data.column_data(column, role),
        }
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if column >= self.column_count || !Self::owns_children(parent) {
            return ModelIndex::invalid();
        }
        match self.forest.read().siblings(Self::owner(parent)).get(row) {
            Some(&child) => ModelIndex::with_internal_id(row, column, parent.clone(), child),
            None => ModelIndex::invalid(),
        }
    }

    fn parent(&self, index: &ModelIndex) -> ModelIndex {
        if !index.is_valid() {
            return ModelIndex::invalid();
        }
        let forest = self.forest.read();
        forest
            .parent_of(index.internal_id())
            .and_then(|parent| forest.index_for(parent))
            .unwrap_or_default()
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        if !index.is_valid() {
            return ItemFlags::disabled();
        }
        self.forest
            .read()
            .nodes
            .get(&index.internal_id())
            .map_or_else(ItemFlags::disabled, |node| node.data.flags())
    }

    fn is_searchable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ModelIndex {
        ModelIndex::invalid()
    }

    fn names(model: &TreeModel<String>, parent: &ModelIndex) -> Vec<String> {
        (0..model.row_count(parent))
            .filter_map(|row| model.display_text(&model.index(row, 0, parent)))
            .collect()
    }

    #[test]
    fn test_build_tree() {
        let model = TreeModel::<String>::new();
        let docs = model.add_root("docs".into());
        model.add_child(docs, "a.txt".into()).unwrap();
        model.add_child(docs, "b.txt".into()).unwrap();
        model.add_root("music".into());

        assert_eq!(model.root_count(), 2);
        let docs_index = model.index_for_node(docs);
        assert_eq!(names(&model, &docs_index), vec!["a.txt", "b.txt"]);
        let child = model.index(1, 0, &docs_index);
        assert_eq!(model.parent(&child), docs_index);
        assert_eq!(model.node_for_index(&docs_index), Some(docs));
    }

    #[test]
    fn test_insert_child_shifts_siblings() {
        let model = TreeModel::<String>::new();
        let docs = model.add_root("docs".into());
        let b = model.add_child(docs, "b".into()).unwrap();
        let held = model.persistent_index(&model.index_for_node(b));

        model.insert_child(Some(docs), 0, "a".into()).unwrap();

        assert_eq!(held.row(), Some(1));
        assert_eq!(model.display_text(&held.index()).as_deref(), Some("b"));
    }

    #[test]
    fn test_remove_subtree_invalidates_descendants() {
        let model = TreeModel::<String>::new();
        let docs = model.add_root("docs".into());
        let file = model.add_child(docs, "file".into()).unwrap();
        let music = model.add_root("music".into());
        let held_file = model.persistent_index(&model.index_for_node(file));
        let held_music = model.persistent_index(&model.index_for_node(music));

        assert_eq!(model.remove(docs).as_deref(), Some("docs"));

        assert!(!held_file.is_valid());
        assert_eq!(held_music.row(), Some(0));
        assert!(model.with_node(file, |_| ()).is_none());
    }

    #[test]
    fn test_move_node_across_parents() {
        let model = TreeModel::<String>::new();
        let docs = model.add_root("docs".into());
        let a = model.add_child(docs, "a".into()).unwrap();
        let b = model.add_child(docs, "b".into()).unwrap();
        let archive = model.add_root("archive".into());
        let old = model.add_child(archive, "old".into()).unwrap();

        let held_a = model.persistent_index(&model.index_for_node(a));
        let held_b = model.persistent_index(&model.index_for_node(b));
        let held_old = model.persistent_index(&model.index_for_node(old));

        assert!(model.move_node(a, Some(archive), 0));

        assert_eq!(held_a.index(), model.index_for_node(a));
        assert_eq!(held_a.parent(), model.index_for_node(archive));
        assert_eq!(held_b.row(), Some(0));
        assert_eq!(held_old.row(), Some(1));
        assert_eq!(model.display_text(&held_a.index()).as_deref(), Some("a"));
    }

    #[test]
    fn test_move_node_into_own_subtree_is_refused() {
        let model = TreeModel::<String>::new();
        let docs = model.add_root("docs".into());
        let inner = model.add_child(docs, "inner".into()).unwrap();
        assert!(!model.move_node(docs, Some(inner), 0));
        assert!(!model.move_node(docs, Some(docs), 0));
        assert_eq!(model.root_count(), 1);
    }

    #[test]
    fn test_descendants_follow_root_move() {
        let model = TreeModel::<String>::new();
        let first = model.add_root("first".into());
        let child = model.add_child(first, "child".into()).unwrap();
        model.add_root("second".into());
        model.add_root("third".into());
        let held = model.persistent_index(&model.index_for_node(child));

        assert!(model.move_node(first, None, 2));

        assert_eq!(held.index(), model.index_for_node(child));
        assert_eq!(held.parent().row(), 2);
    }

    #[test]
    fn test_modify_node() {
        let model = TreeModel::<String>::new();
        let id = model.add_root("a".into());
        model.modify_node(id, |name| name.push('!'));
        assert_eq!(model.with_node(id, |name| name.clone()).as_deref(), Some("a!"));
    }

    #[test]
    fn test_clear() {
        let model = TreeModel::<String>::new();
        let id = model.add_root("a".into());
        let held = model.persistent_index(&model.index_for_node(id));
        model.clear();
        assert!(model.is_empty());
        assert!(!held.is_valid());
    }
}
