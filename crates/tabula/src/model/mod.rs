//! Model layer for tabula.
//!
//! This module provides hierarchical, tabular models whose cells can be
//! referenced across structural edits, and a proxy that filters and sorts
//! another model without copying it.
//!
//! # Core Types
//!
//! - `ModelIndex`: Identifies an item's position in a model
//! - `PersistentModelIndex`: A position that follows its item across edits
//! - `ItemRole` / `ItemData`: What data to access, and the data itself
//! - `ItemModel`: The trait that models implement, including the
//!   `begin_*`/`end_*` edit brackets
//! - `Operation`: A recorded structural edit
//! - `ModelSignals`: Signals for change notifications
//!
//! # Model Implementations
//!
//! - `ListModel`: Flat list of items
//! - `TreeModel`: Hierarchical tree structure with parent-child relationships
//! - `ProxyModel`: Wraps another model to provide filtering and sorting
//!
//! # Example
//!
//! ```
//! use tabula::model::{ItemModel, ListModel, ModelIndex};
//!
//! let model = ListModel::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
//! let root = ModelIndex::invalid();
//! let c = model.persistent_index(&model.index(2, 0, &root));
//!
//! model.remove(0);
//! assert_eq!(c.row(), Some(1));
//!
//! model.remove(1);
//! assert!(!c.is_valid());
//! ```
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────┐ begin/end ┌─────────────┐  rewrite  ┌─────────────┐
//! │  Mutator    │──────────>│  ModelBase  │──────────>│ Persistent  │
//! │             │           │ (op stack)  │           │  registry   │
//! └─────────────┘           └─────────────┘           └─────────────┘
//!                                  │ model_updated
//!                                  v
//!                           ┌─────────────┐
//!                           │ ProxyModel  │  drops mappings, rebuilds lazily
//!                           └─────────────┘
//! ```

mod base;
mod index;
mod list_model;
mod operation;
mod persistent;
mod proxy_model;
mod role;
mod traits;
mod tree_model;

pub use base::ModelBase;
pub use index::ModelIndex;
pub use list_model::{ListItem, ListModel};
pub use operation::{Direction, Operation, OperationKind};
pub use persistent::{PersistentHandle, PersistentIndexRegistry, PersistentModelIndex};
pub use proxy_model::{CaseSensitivity, ProxyModel, ProxyModelBuilder, ProxySettings};
pub use role::{ItemData, ItemRole, TriState};
pub use traits::{
    ItemFlags, ItemModel, MatchesFlags, ModelSignals, Orientation, SortOrder, UpdateFlags,
};
pub use tree_model::{NodeId, TreeModel, TreeNodeData};

static_assertions::assert_impl_all!(ModelBase: Send, Sync);
static_assertions::assert_impl_all!(PersistentModelIndex: Send, Sync);
static_assertions::assert_impl_all!(ListModel<String>: Send, Sync);
static_assertions::assert_impl_all!(TreeModel<String>: Send, Sync);
static_assertions::assert_impl_all!(ProxyModel<ListModel<String>>: Send, Sync);
