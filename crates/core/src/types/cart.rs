//! Cart line items and the optimistic cart transitions.
//!
//! [`Cart`] is the in-memory collection a client session shows to the user.
//! It upholds two invariants on every transition:
//!
//! - at most one line per [`CatalogId`]
//! - every line has a quantity of at least one; a transition that would take a
//!   line to zero or below removes it instead
//!
//! Insertion order is preserved and is the display order.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CatalogId, CategoryId, ProductId, RemoteLineId};
use super::price::PriceInput;

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Catalog identity of the product. Never changes once the line exists.
    pub catalog_id: CatalogId,
    /// Product name shown to the user.
    pub display_name: String,
    /// Price of a single unit.
    pub unit_price: Decimal,
    /// Number of units, always at least one.
    pub quantity: u32,
    /// Product image URL or asset reference.
    #[serde(default)]
    pub image_ref: Option<String>,
    /// Selling unit, e.g. `kg` or `pc`.
    #[serde(default)]
    pub unit_label: Option<String>,
    /// Backend category, required for remote sync.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Backend product, required for remote sync.
    #[serde(default)]
    pub product_id: Option<ProductId>,
    /// Backend line id, present once the remote cart acknowledged the line.
    #[serde(default)]
    pub remote_line_id: Option<RemoteLineId>,
    /// Pass-through delivery charge.
    #[serde(default)]
    pub delivery_charge: Option<Decimal>,
    /// Pass-through delivery date.
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
}

impl CartLineItem {
    /// Price of the whole line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Whether the line carries the keys needed to create it remotely.
    #[must_use]
    pub const fn is_syncable(&self) -> bool {
        self.category_id.is_some() && self.product_id.is_some()
    }
}

/// A product the user wants to put in the cart.
///
/// The price is kept unvalidated until the line is sent to the remote cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCandidate {
    pub catalog_id: CatalogId,
    pub display_name: String,
    pub unit_price: PriceInput,
    pub image_ref: Option<String>,
    pub unit_label: Option<String>,
    pub category_id: Option<CategoryId>,
    pub product_id: Option<ProductId>,
    pub delivery_charge: Option<Decimal>,
    pub delivery_date: Option<NaiveDate>,
}

impl LineCandidate {
    /// Create a candidate with only a catalog id and a name.
    #[must_use]
    pub fn new(catalog_id: CatalogId, display_name: impl Into<String>) -> Self {
        Self {
            catalog_id,
            display_name: display_name.into(),
            unit_price: PriceInput::Missing,
            image_ref: None,
            unit_label: None,
            category_id: None,
            product_id: None,
            delivery_charge: None,
            delivery_date: None,
        }
    }

    #[must_use]
    pub fn with_price(mut self, price: impl Into<PriceInput>) -> Self {
        self.unit_price = price.into();
        self
    }

    #[must_use]
    pub fn with_remote_keys(mut self, category_id: CategoryId, product_id: ProductId) -> Self {
        self.category_id = Some(category_id);
        self.product_id = Some(product_id);
        self
    }

    #[must_use]
    pub fn with_unit_label(mut self, unit_label: impl Into<String>) -> Self {
        self.unit_label = Some(unit_label.into());
        self
    }

    #[must_use]
    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    #[must_use]
    pub const fn with_delivery(
        mut self,
        delivery_charge: Option<Decimal>,
        delivery_date: Option<NaiveDate>,
    ) -> Self {
        self.delivery_charge = delivery_charge;
        self.delivery_date = delivery_date;
        self
    }

    /// Whether the candidate carries the keys needed to create it remotely.
    #[must_use]
    pub const fn is_syncable(&self) -> bool {
        self.category_id.is_some() && self.product_id.is_some()
    }

    fn into_line(self, quantity: u32) -> CartLineItem {
        CartLineItem {
            catalog_id: self.catalog_id,
            display_name: self.display_name,
            unit_price: self.unit_price.lenient(),
            quantity,
            image_ref: self.image_ref,
            unit_label: self.unit_label,
            category_id: self.category_id,
            product_id: self.product_id,
            remote_line_id: None,
            delivery_charge: self.delivery_charge,
            delivery_date: self.delivery_date,
        }
    }
}

/// What an optimistic add did, so it can be undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticAdd {
    /// An existing line's quantity was raised by `added`.
    Incremented { added: u32 },
    /// A new line was appended with quantity `added`.
    Appended { added: u32 },
}

/// Ordered cart lines, unique by catalog id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from arbitrary lines.
    ///
    /// Lines with a zero quantity are dropped and lines sharing a catalog id
    /// are folded into the first occurrence (quantities summed, the first
    /// line's remote id kept).
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLineItem>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.position(line.catalog_id) {
                Some(index) => {
                    if let Some(existing) = cart.lines.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(line.quantity);
                    }
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLineItem] {
        &self.lines
    }

    #[must_use]
    pub fn into_lines(self) -> Vec<CartLineItem> {
        self.lines
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn get(&self, catalog_id: CatalogId) -> Option<&CartLineItem> {
        self.lines.iter().find(|line| line.catalog_id == catalog_id)
    }

    fn position(&self, catalog_id: CatalogId) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| line.catalog_id == catalog_id)
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLineItem::line_total).sum()
    }

    /// Optimistically add `quantity` units of a candidate.
    ///
    /// A zero quantity is treated as one.
    pub fn apply_add(&mut self, candidate: LineCandidate, quantity: u32) -> OptimisticAdd {
        let added = quantity.max(1);
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.catalog_id == candidate.catalog_id)
        {
            let before = line.quantity;
            line.quantity = before.saturating_add(added);
            return OptimisticAdd::Incremented {
                added: line.quantity - before,
            };
        }

        self.lines.push(candidate.into_line(added));
        OptimisticAdd::Appended { added }
    }

    /// Undo an [`apply_add`](Self::apply_add) for the given catalog id.
    pub fn revert_add(&mut self, catalog_id: CatalogId, outcome: OptimisticAdd) {
        let Some(index) = self.position(catalog_id) else {
            return;
        };
        let remove = match outcome {
            OptimisticAdd::Appended { .. } => true,
            OptimisticAdd::Incremented { added } => self.lines.get_mut(index).is_some_and(|line| {
                line.quantity = line.quantity.saturating_sub(added);
                line.quantity == 0
            }),
        };
        if remove {
            self.lines.remove(index);
        }
    }

    /// Set a line's quantity; zero or below removes the line.
    ///
    /// Returns `false` if no line has that catalog id.
    pub fn set_quantity(&mut self, catalog_id: CatalogId, quantity: i64) -> bool {
        let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
        if quantity == 0 {
            return self.remove(catalog_id).is_some();
        }
        match self
            .lines
            .iter_mut()
            .find(|line| line.catalog_id == catalog_id)
        {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove the line with the given catalog id.
    pub fn remove(&mut self, catalog_id: CatalogId) -> Option<CartLineItem> {
        self.position(catalog_id).map(|index| self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
