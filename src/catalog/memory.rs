//! In-memory product catalog
//!
//! Plays the persistence collaborator: it stores cards and fires the
//! persistence hook after every successful create or update.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::item::{CartItem, CartItemPatch, NewCartItem};
use super::CatalogError;
use crate::publisher::PersistHook;

struct CatalogInner {
    items: BTreeMap<u64, CartItem>,
    next_id: u64,
}

/// Thread-safe in-memory store of product cards
pub struct MemoryCatalog {
    inner: RwLock<CatalogInner>,
    hook: Option<Arc<dyn PersistHook<CartItem>>>,
}

impl MemoryCatalog {
    /// Create a catalog with no persistence hook
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CatalogInner {
                items: BTreeMap::new(),
                next_id: 1,
            }),
            hook: None,
        }
    }

    /// Create a catalog that reports every save to `hook`
    pub fn with_hook(hook: Arc<dyn PersistHook<CartItem>>) -> Self {
        Self {
            hook: Some(hook),
            ..Self::new()
        }
    }

    /// Create a card owned by `author`
    pub fn create(&self, new: NewCartItem, author: Option<u64>) -> Result<CartItem, CatalogError> {
        new.validate()?;

        let mut inner = self.inner.write();
        let id = inner.next_id;
        inner.next_id += 1;

        let item = CartItem::from_new(id, new, author);
        inner.items.insert(id, item.clone());

        // Fired under the write lock so notification order matches commit order
        self.saved(&item, true);
        Ok(item)
    }

    /// Replace every writable field of a card
    pub fn update(&self, id: u64, new: NewCartItem) -> Result<CartItem, CatalogError> {
        new.validate()?;

        let mut inner = self.inner.write();
        let item = inner.items.get_mut(&id).ok_or(CatalogError::NotFound(id))?;
        item.replace(new);
        let item = item.clone();

        self.saved(&item, false);
        Ok(item)
    }

    /// Update only the fields present in `patch`
    pub fn partial_update(&self, id: u64, patch: CartItemPatch) -> Result<CartItem, CatalogError> {
        patch.validate()?;

        let mut inner = self.inner.write();
        let item = inner.items.get_mut(&id).ok_or(CatalogError::NotFound(id))?;
        item.apply(patch);
        let item = item.clone();

        self.saved(&item, false);
        Ok(item)
    }

    /// Delete a card
    ///
    /// Deletions are not published.
    pub fn delete(&self, id: u64) -> Result<CartItem, CatalogError> {
        self.inner
            .write()
            .items
            .remove(&id)
            .ok_or(CatalogError::NotFound(id))
    }

    /// Fetch a card
    pub fn get(&self, id: u64) -> Option<CartItem> {
        self.inner.read().items.get(&id).cloned()
    }

    /// All cards ordered by id
    pub fn list(&self) -> Vec<CartItem> {
        self.inner.read().items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn saved(&self, item: &CartItem, was_created: bool) {
        if let Some(hook) = &self.hook {
            hook.on_entity_persisted(item, was_created);
        }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}
