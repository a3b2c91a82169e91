//! Saved-for-later products.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::CatalogId;

/// A product the user marked as a favourite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub catalog_id: CatalogId,
    pub display_name: String,
    pub unit_price: Decimal,
    #[serde(default)]
    pub image_ref: Option<String>,
}

/// Ordered wishlist, unique by catalog id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist {
    items: Vec<WishlistItem>,
}

impl Wishlist {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, catalog_id: CatalogId) -> bool {
        self.items.iter().any(|item| item.catalog_id == catalog_id)
    }

    /// Add the item if absent, remove it if present.
    ///
    /// Returns whether the item is in the wishlist afterwards.
    pub fn toggle(&mut self, item: WishlistItem) -> bool {
        if self.remove(item.catalog_id).is_some() {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn remove(&mut self, catalog_id: CatalogId) -> Option<WishlistItem> {
        let index = self
            .items
            .iter()
            .position(|item| item.catalog_id == catalog_id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
