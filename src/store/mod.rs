// src/store/mod.rs
//
// Post Record Store: persisted records plus the derived index.
// All post mutations in the crate go through `PostStore`.

pub mod index;
pub mod layout;
pub mod post_store;

pub use index::PostIndex;
pub use layout::{sanitize_component, StoreLayout};
pub use post_store::{DeleteFailure, DeleteReport, PostStore};
