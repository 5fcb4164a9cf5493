//! tabula - hierarchical table models with persistent indices and a
//! filtering/sorting proxy.
//!
//! Models expose rows × columns of data, optionally nested into a tree.
//! Structural edits are bracketed by `begin_*`/`end_*` calls so that every
//! [`PersistentModelIndex`](model::PersistentModelIndex) handed out keeps
//! pointing at its item, or reports itself invalid once the item is gone.
//! [`ProxyModel`](model::ProxyModel) derives a filtered and sorted view of
//! any model on top of that machinery.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tabula::model::{ItemModel, ListModel, ModelIndex, ProxyModel};
//!
//! let source = Arc::new(ListModel::new(vec![
//!     "keep a".to_string(),
//!     "skip".to_string(),
//!     "keep b".to_string(),
//! ]));
//! let proxy = ProxyModel::new(source.clone());
//! proxy.filter("keep");
//!
//! let root = ModelIndex::invalid();
//! assert_eq!(proxy.row_count(&root), 2);
//! assert_eq!(proxy.map_to_source(&proxy.index(1, 0, &root)).row(), 2);
//! ```
//!
//! Logging goes through `tracing`; see [`tabula_core::logging`] for the
//! targets.

mod error;
pub mod model;

pub use error::{Error, Result};
pub use tabula_core::{ConnectionGuard, ConnectionId, Signal};
