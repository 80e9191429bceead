//! Product card model
//!
//! `CartItem` serializes to the same flat shape for a direct fetch and for
//! a feed notification.

use serde::{Deserialize, Serialize};

use super::CatalogError;

/// Maximum length of a product name
pub const MAX_NAME_LEN: usize = 200;

/// A product card in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_name: String,
    pub product_price: f64,
    pub product_quantity: u32,
    pub id: u64,
    /// Owning user, if any
    pub author: Option<u64>,
}

fn default_quantity() -> u32 {
    1
}

/// Fields for creating or fully replacing a card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub product_name: String,
    pub product_price: f64,
    /// Defaults to 1 when omitted
    #[serde(default = "default_quantity")]
    pub product_quantity: u32,
}

impl NewCartItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            product_name: name.into(),
            product_price: price,
            product_quantity: default_quantity(),
        }
    }

    /// Set quantity
    pub fn quantity(mut self, quantity: u32) -> Self {
        self.product_quantity = quantity;
        self
    }

    pub(super) fn validate(&self) -> Result<(), CatalogError> {
        validate_name(&self.product_name)?;
        validate_price(self.product_price)
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CartItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_quantity: Option<u32>,
}

impl CartItemPatch {
    pub fn price(mut self, price: f64) -> Self {
        self.product_price = Some(price);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.product_quantity = Some(quantity);
        self
    }

    pub(super) fn validate(&self) -> Result<(), CatalogError> {
        if let Some(name) = &self.product_name {
            validate_name(name)?;
        }
        if let Some(price) = self.product_price {
            validate_price(price)?;
        }
        Ok(())
    }
}

impl CartItem {
    pub(super) fn from_new(id: u64, new: NewCartItem, author: Option<u64>) -> Self {
        Self {
            product_name: new.product_name,
            product_price: new.product_price,
            product_quantity: new.product_quantity,
            id,
            author,
        }
    }

    pub(super) fn replace(&mut self, new: NewCartItem) {
        self.product_name = new.product_name;
        self.product_price = new.product_price;
        self.product_quantity = new.product_quantity;
    }

    pub(super) fn apply(&mut self, patch: CartItemPatch) {
        if let Some(name) = patch.product_name {
            self.product_name = name;
        }
        if let Some(price) = patch.product_price {
            self.product_price = price;
        }
        if let Some(quantity) = patch.product_quantity {
            self.product_quantity = quantity;
        }
    }
}

fn validate_name(name: &str) -> Result<(), CatalogError> {
    if name.trim().is_empty() {
        return Err(CatalogError::Invalid("product_name may not be blank".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CatalogError::Invalid(format!(
            "product_name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<(), CatalogError> {
    if !price.is_finite() {
        return Err(CatalogError::Invalid("product_price must be a finite number".into()));
    }
    Ok(())
}
