//! Product catalog
//!
//! The persistence side of the feed: product cards and an in-memory store
//! that reports each successful save through a [`PersistHook`].
//!
//! [`PersistHook`]: crate::publisher::PersistHook

pub mod item;
pub mod memory;

use thiserror::Error;

pub use item::{CartItem, CartItemPatch, NewCartItem, MAX_NAME_LEN};
pub use memory::MemoryCatalog;

/// Catalog operation failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("cart item not found: {0}")]
    NotFound(u64),

    #[error("invalid cart item: {0}")]
    Invalid(String),
}
