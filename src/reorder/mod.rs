//! Drag-and-drop reordering: the scoped ordering model, drag identifier
//! grammar, and the optimistic-update protocol with its HTTP store.

pub mod client;
pub mod drag;
pub mod model;
pub mod protocol;

pub use client::HttpRankStore;
pub use drag::{DragId, ReorderScope};
pub use model::Snapshot;
pub use protocol::{RankStore, ReorderOutcome, Reorderer, StoreError};
