//! The `services` module provides a high-level API for interacting with the
//! database. It encapsulates the query logic so that HTTP handlers work with
//! domain models without knowing about the underlying schema.
//!
//! One sub-module per domain entity; everything is re-exported here for
//! access under `crate::db::services::*`.

pub mod link_service;
pub mod tab_service;
pub mod tag_service;
pub mod user_service;

pub use link_service::*;
pub use tab_service::*;
pub use tag_service::*;
pub use user_service::*;
