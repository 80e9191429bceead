//! Group naming
//!
//! A group is a named broadcast topic. Sessions subscribe by joining it.

use std::borrow::Borrow;
use std::sync::Arc;

/// Well-known group carrying every product create/update
pub const PRODUCTS_UPDATES: &str = "products_updates";

/// Name of a broadcast group
///
/// Cheap to clone; the name is shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupName(Arc<str>);

impl GroupName {
    /// Create a group name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The product-updates group
    pub fn products() -> Self {
        Self::new(PRODUCTS_UPDATES)
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GroupName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for GroupName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl Borrow<str> for GroupName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_products_group() {
        assert_eq!(GroupName::products().as_str(), "products_updates");
        assert_eq!(GroupName::products(), GroupName::from(PRODUCTS_UPDATES));
    }

    #[test]
    fn test_display() {
        let group = GroupName::new("orders_updates");
        assert_eq!(group.to_string(), "orders_updates");
    }

    #[test]
    fn test_borrow_lookup() {
        let mut map = std::collections::HashMap::new();
        map.insert(GroupName::products(), 1);
        assert_eq!(map.get("products_updates"), Some(&1));
    }
}
