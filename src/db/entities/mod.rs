//! SeaORM entities mapping to the LinkHub database tables.
//!
//! Each entity lives in its own module (`user.rs`, `link.rs`, ...).

pub mod link;
pub mod link_tag;
pub mod tab;
pub mod tag;
pub mod user;
