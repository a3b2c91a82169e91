//! Cart synchronizer.
//!
//! Keeps the session's cart in memory, mirrors it to durable storage on every
//! change and, when a session credential is present, reconciles it with the
//! remote cart resource.
//!
//! # Reconciliation
//!
//! Local changes are applied first and are what readers see while a remote
//! call is in flight. After a successful mutating call the whole remote cart
//! is fetched and replaces the local one. The replace does not merge: if two
//! operations overlap, whichever re-fetch response arrives last wins, and an
//! optimistic change to another line made in between can be overwritten.
//!
//! Remote failures never reach the caller. Adds keep their optimistic line;
//! removals and quantity changes fall back to changing the line locally.

use std::sync::Arc;

use chrono::Local;
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use cartsync_core::{Cart, CartLineItem, CatalogId, LineCandidate, PriceError};

use crate::config::DEFAULT_UNIT_LABEL;
use crate::credentials::{CredentialProvider, SyncMode};
use crate::remote::{CartResource, NewCartLine};
use crate::snapshot::PersistedState;
use crate::storage::{KeyValueStore, keys};

/// Errors surfaced to the caller of a cart mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The line's price cannot be sent to the remote cart.
    #[error("Cannot add product {catalog_id} to the cart: {source}")]
    InvalidPrice {
        catalog_id: CatalogId,
        #[source]
        source: PriceError,
    },
}

/// Owner of the session's cart.
pub struct CartSynchronizer {
    state: PersistedState<Cart>,
    credentials: Arc<dyn CredentialProvider>,
    remote: Arc<dyn CartResource>,
    default_unit: String,
}

impl CartSynchronizer {
    /// Create an empty, not yet hydrated cart.
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        credentials: Arc<dyn CredentialProvider>,
        remote: Arc<dyn CartResource>,
    ) -> Self {
        Self {
            state: PersistedState::new(store, keys::CART),
            credentials,
            remote,
            default_unit: DEFAULT_UNIT_LABEL.to_string(),
        }
    }

    /// Use a different unit label for lines that do not carry one.
    #[must_use]
    pub fn with_default_unit(mut self, unit: impl Into<String>) -> Self {
        self.default_unit = unit.into();
        self
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A copy of the cart.
    pub async fn cart(&self) -> Cart {
        self.state.snapshot().await
    }

    /// The cart lines in display order.
    pub async fn items(&self) -> Vec<CartLineItem> {
        self.state.with(|cart| cart.lines().to_vec()).await
    }

    /// Total number of units in the cart.
    pub async fn count(&self) -> u64 {
        self.state.with(Cart::count).await
    }

    /// Total price of the cart.
    pub async fn total(&self) -> Decimal {
        self.state.with(Cart::total).await
    }

    pub async fn is_hydrated(&self) -> bool {
        self.state.is_hydrated().await
    }

    // =========================================================================
    // Hydration
    // =========================================================================

    /// Load the cart from the remote resource or, failing that, from storage.
    ///
    /// Never fails; errors are logged and the stored snapshot is used.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) {
        if let SyncMode::Synchronized(token) = SyncMode::resolve(self.credentials.as_ref()).await {
            match self.remote.list_lines(&token).await {
                Ok(lines) if !lines.is_empty() => {
                    debug!(count = lines.len(), "Hydrated cart from remote");
                    self.state.hydrate_with(Cart::from_lines(lines)).await;
                    return;
                }
                Ok(_) => debug!("Remote cart is empty, falling back to stored cart"),
                Err(e) => warn!(error = %e, "Failed to fetch remote cart, falling back to stored cart"),
            }
        }

        match self.state.load_stored().await {
            Some(cart) => {
                debug!(count = cart.len(), "Hydrated cart from storage");
                self.state.hydrate_with(cart).await;
            }
            None => self.state.mark_hydrated().await,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of a product.
    ///
    /// The line is added locally before anything else happens. It is then
    /// created remotely when a credential is present and the candidate carries
    /// its category and product ids.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidPrice` if the line would be sent remotely
    /// but its price is missing, non-numeric or not positive. The local add
    /// is undone in that case.
    #[instrument(skip(self, candidate), fields(catalog_id = %candidate.catalog_id))]
    pub async fn add_line(&self, candidate: LineCandidate, quantity: u32) -> Result<(), CartError> {
        let catalog_id = candidate.catalog_id;
        let outcome = self
            .state
            .mutate(|cart| cart.apply_add(candidate.clone(), quantity))
            .await;

        let SyncMode::Synchronized(token) = SyncMode::resolve(self.credentials.as_ref()).await else {
            return Ok(());
        };
        let (Some(category_id), Some(product_id)) = (candidate.category_id, candidate.product_id) else {
            debug!("Candidate lacks remote keys, keeping line local");
            return Ok(());
        };

        let price = match candidate.unit_price.resolve() {
            Ok(price) => price,
            Err(source) => {
                self.state
                    .mutate(|cart| cart.revert_add(catalog_id, outcome))
                    .await;
                return Err(CartError::InvalidPrice { catalog_id, source });
            }
        };

        let line = NewCartLine {
            category_id,
            product_id,
            quantity: quantity.max(1),
            unit_label: candidate
                .unit_label
                .clone()
                .unwrap_or_else(|| self.default_unit.clone()),
            price,
            delivery_charge: candidate.delivery_charge.unwrap_or(Decimal::ZERO),
            delivery_date: candidate
                .delivery_date
                .unwrap_or_else(|| Local::now().date_naive()),
        };

        match self.remote.create_line(&token, &line).await {
            Ok(true) => {
                self.reload(&token).await;
            }
            Ok(false) => debug!("Create response carried no record, keeping local line"),
            Err(e) => warn!(error = %e, "Failed to create remote cart line, keeping local line"),
        }
        Ok(())
    }

    /// Remove a product's line.
    #[instrument(skip(self))]
    pub async fn remove_line(&self, catalog_id: CatalogId) {
        let mode = SyncMode::resolve(self.credentials.as_ref()).await;
        let remote_id = self
            .state
            .with(|cart| cart.get(catalog_id).and_then(|line| line.remote_line_id))
            .await;

        if let (Some(token), Some(remote_id)) = (mode.token(), remote_id) {
            match self.remote.delete_line(token, remote_id).await {
                Ok(()) => {
                    if self.reload(token).await {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to delete remote cart line, removing locally"),
            }
        }

        self.state.mutate(|cart| cart.remove(catalog_id)).await;
    }

    /// Set a product's quantity. Zero or below removes the line.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, catalog_id: CatalogId, quantity: i64) {
        let Ok(quantity) = u32::try_from(quantity) else {
            if quantity <= 0 {
                self.remove_line(catalog_id).await;
            } else {
                self.set_quantity_checked(catalog_id, u32::MAX).await;
            }
            return;
        };
        if quantity == 0 {
            self.remove_line(catalog_id).await;
            return;
        }
        self.set_quantity_checked(catalog_id, quantity).await;
    }

    async fn set_quantity_checked(&self, catalog_id: CatalogId, quantity: u32) {
        let mode = SyncMode::resolve(self.credentials.as_ref()).await;
        let remote_id = self
            .state
            .with(|cart| cart.get(catalog_id).and_then(|line| line.remote_line_id))
            .await;

        if let (Some(token), Some(remote_id)) = (mode.token(), remote_id) {
            match self.remote.update_line(token, remote_id, quantity).await {
                Ok(()) => {
                    if self.reload(token).await {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to update remote cart line, updating locally"),
            }
        }

        self.state
            .mutate(|cart| cart.set_quantity(catalog_id, i64::from(quantity)))
            .await;
    }

    /// Empty the cart. Local only; the remote cart is left as it is.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.state.mutate(Cart::clear).await;
    }

    /// Replace the cart with the remote one. Returns `false` if the fetch failed.
    async fn reload(&self, token: &SecretString) -> bool {
        match self.remote.list_lines(token).await {
            Ok(lines) => {
                self.state.replace(Cart::from_lines(lines)).await;
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to re-fetch remote cart");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cartsync_core::{CategoryId, ProductId};

    use super::*;
    use crate::credentials::StaticCredential;
    use crate::storage::{MemoryStore, load_json};
    use crate::testing::{FakeRemote, RemoteCall};

    struct Fixture {
        store: Arc<MemoryStore>,
        remote: Arc<FakeRemote>,
        cart: CartSynchronizer,
    }

    fn fixture(credential: StaticCredential) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(FakeRemote::new());
        let cart = CartSynchronizer::new(store.clone(), Arc::new(credential), remote.clone());
        Fixture {
            store,
            remote,
            cart,
        }
    }

    fn guest() -> Fixture {
        fixture(StaticCredential::none())
    }

    fn signed_in() -> Fixture {
        fixture(StaticCredential::new("token"))
    }

    fn mango() -> LineCandidate {
        LineCandidate::new(CatalogId::new(7), "Mango")
            .with_price(25_i64)
            .with_remote_keys(CategoryId::new(3), ProductId::new(7))
    }

    #[tokio::test]
    async fn test_guest_adds_distinct_lines() {
        let f = guest();
        for (id, qty) in [(1, 2), (2, 1), (3, 4)] {
            f.cart
                .add_line(LineCandidate::new(CatalogId::new(id), "x").with_price(10_i64), qty)
                .await
                .unwrap();
        }

        assert_eq!(f.cart.items().await.len(), 3);
        assert_eq!(f.cart.count().await, 7);
        assert!(f.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_guest_scenario_totals() {
        let f = guest();
        f.cart
            .add_line(LineCandidate::new(CatalogId::new(7), "Mango").with_price(25_i64), 2)
            .await
            .unwrap();
        assert_eq!(f.cart.total().await, Decimal::from(50));

        f.cart
            .add_line(LineCandidate::new(CatalogId::new(7), "Mango"), 1)
            .await
            .unwrap();
        let items = f.cart.items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().map(|l| l.quantity), Some(3));
        assert_eq!(f.cart.total().await, Decimal::from(75));

        f.cart.set_quantity(CatalogId::new(7), 0).await;
        assert!(f.cart.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_guest_line_with_bad_price_is_kept_locally() {
        let f = guest();
        let candidate = mango().with_price("abc");
        f.cart.add_line(candidate, 1).await.unwrap();
        assert_eq!(f.cart.count().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_price_rolls_back_and_skips_remote() {
        let f = signed_in();
        f.cart
            .add_line(LineCandidate::new(CatalogId::new(1), "Rice").with_price(40_i64), 1)
            .await
            .unwrap();
        let before = f.cart.cart().await;

        let result = f.cart.add_line(mango().with_price("abc"), 2).await;

        assert!(matches!(
            result,
            Err(CartError::InvalidPrice {
                source: PriceError::NotNumeric(_),
                ..
            })
        ));
        assert_eq!(f.cart.cart().await, before);
        assert!(f.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_price_on_existing_line_restores_quantity() {
        let f = signed_in();
        f.cart
            .add_line(LineCandidate::new(CatalogId::new(7), "Mango").with_price(25_i64), 2)
            .await
            .unwrap();
        let before = f.cart.cart().await;

        let result = f.cart.add_line(mango().with_price(0_i64), 3).await;

        assert!(result.is_err());
        assert_eq!(f.cart.cart().await, before);
    }

    #[tokio::test]
    async fn test_signed_in_add_creates_and_reloads() {
        let f = signed_in();
        f.cart
            .add_line(mango().with_price("25.50"), 2)
            .await
            .unwrap();

        let created = f.remote.created_lines();
        assert_eq!(created.len(), 1);
        let line = created.first().unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.unit_label, "kg");
        assert_eq!(line.price, Decimal::new(2550, 2));
        assert_eq!(line.delivery_charge, Decimal::ZERO);
        assert_eq!(line.delivery_date, Local::now().date_naive());

        let items = f.cart.items().await;
        assert_eq!(items.len(), 1);
        assert!(items.first().unwrap().remote_line_id.is_some());
        assert_eq!(
            f.remote.calls(),
            vec![RemoteCall::CreateLine, RemoteCall::ListLines]
        );
    }

    #[tokio::test]
    async fn test_signed_in_add_without_remote_keys_stays_local() {
        let f = signed_in();
        f.cart
            .add_line(LineCandidate::new(CatalogId::new(9), "Loose").with_price(5_i64), 1)
            .await
            .unwrap();

        assert_eq!(f.cart.count().await, 1);
        assert!(f.remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_optimistic_line() {
        let f = signed_in();
        f.remote.fail_all(true);

        f.cart.add_line(mango(), 1).await.unwrap();

        let items = f.cart.items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().and_then(|l| l.remote_line_id), None);
    }

    #[tokio::test]
    async fn test_reload_replaces_local_state_wholesale() {
        let f = signed_in();
        // A line only the server knows about
        f.remote.seed_line(CatalogId::new(50), 4, Decimal::from(3));
        // A local-only line that the reload will drop
        f.cart
            .add_line(LineCandidate::new(CatalogId::new(60), "Local").with_price(1_i64), 1)
            .await
            .unwrap();

        f.cart.add_line(mango(), 1).await.unwrap();

        let ids: Vec<i64> = f
            .cart
            .items()
            .await
            .iter()
            .map(|l| l.catalog_id.as_i64())
            .collect();
        assert_eq!(ids, vec![50, 7]);
    }

    #[tokio::test]
    async fn test_remove_without_remote_id_skips_delete() {
        let f = signed_in();
        f.cart
            .add_line(LineCandidate::new(CatalogId::new(9), "Loose").with_price(5_i64), 1)
            .await
            .unwrap();

        f.cart.remove_line(CatalogId::new(9)).await;

        assert!(f.cart.items().await.is_empty());
        assert!(!f.remote.calls().contains(&RemoteCall::DeleteLine));
    }

    #[tokio::test]
    async fn test_remove_synced_line_deletes_remotely() {
        let f = signed_in();
        f.cart.add_line(mango(), 1).await.unwrap();

        f.cart.remove_line(CatalogId::new(7)).await;

        assert!(f.cart.items().await.is_empty());
        assert!(f.remote.calls().contains(&RemoteCall::DeleteLine));
        assert!(f.remote.remote_lines().is_empty());
    }

    #[tokio::test]
    async fn test_remove_falls_back_to_local_on_failure() {
        let f = signed_in();
        f.cart.add_line(mango(), 1).await.unwrap();
        f.remote.fail_all(true);

        f.cart.remove_line(CatalogId::new(7)).await;

        assert!(f.cart.items().await.is_empty());
        assert_eq!(f.remote.remote_lines().len(), 1);
    }

    #[tokio::test]
    async fn test_set_quantity_updates_remotely() {
        let f = signed_in();
        f.cart.add_line(mango(), 1).await.unwrap();

        f.cart.set_quantity(CatalogId::new(7), 5).await;

        assert_eq!(f.cart.count().await, 5);
        assert!(f.remote.calls().contains(&RemoteCall::UpdateLine));
        assert_eq!(
            f.remote.remote_lines().first().map(|l| l.quantity),
            Some(5)
        );
    }

    #[tokio::test]
    async fn test_set_quantity_falls_back_to_local_on_failure() {
        let f = signed_in();
        f.cart.add_line(mango(), 1).await.unwrap();
        f.remote.fail_all(true);

        f.cart.set_quantity(CatalogId::new(7), 4).await;

        assert_eq!(f.cart.count().await, 4);
    }

    #[tokio::test]
    async fn test_set_quantity_applies_locally_when_reload_fails() {
        let f = signed_in();
        f.cart.add_line(mango(), 1).await.unwrap();
        f.remote.fail_lists(true);

        f.cart.set_quantity(CatalogId::new(7), 6).await;

        assert_eq!(f.cart.count().await, 6);
        assert_eq!(
            f.remote.remote_lines().first().map(|l| l.quantity),
            Some(6)
        );
        assert_eq!(
            f.remote.calls()[2..],
            [RemoteCall::UpdateLine, RemoteCall::ListLines]
        );
    }

    #[tokio::test]
    async fn test_remove_applies_locally_when_reload_fails() {
        let f = signed_in();
        f.cart.add_line(mango(), 1).await.unwrap();
        f.remote.fail_lists(true);

        f.cart.remove_line(CatalogId::new(7)).await;

        assert!(f.cart.items().await.is_empty());
        assert!(f.remote.remote_lines().is_empty());
        assert_eq!(
            f.remote.calls()[2..],
            [RemoteCall::DeleteLine, RemoteCall::ListLines]
        );
    }

    #[tokio::test]
    async fn test_invalid_price_rollback_after_saturating_add() {
        let f = signed_in();
        f.cart
            .add_line(LineCandidate::new(CatalogId::new(7), "Mango").with_price(25_i64), u32::MAX - 1)
            .await
            .unwrap();
        let before = f.cart.cart().await;

        let result = f.cart.add_line(mango().with_price("abc"), 5).await;

        assert!(result.is_err());
        assert_eq!(f.cart.cart().await, before);
    }

    #[tokio::test]
    async fn test_set_quantity_zero_equals_remove() {
        let f = signed_in();
        f.cart.add_line(mango(), 1).await.unwrap();

        f.cart.set_quantity(CatalogId::new(7), 0).await;

        assert!(f.cart.items().await.is_empty());
        assert!(f.remote.calls().contains(&RemoteCall::DeleteLine));
    }

    #[tokio::test]
    async fn test_clear_is_local_only() {
        let f = signed_in();
        f.cart.add_line(mango(), 1).await.unwrap();
        let calls_before = f.remote.calls().len();

        f.cart.clear().await;

        assert!(f.cart.items().await.is_empty());
        assert_eq!(f.remote.calls().len(), calls_before);
        assert_eq!(f.remote.remote_lines().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_then_hydrate_restores_remote_state() {
        let f = signed_in();
        f.remote.seed_line(CatalogId::new(50), 4, Decimal::from(3));
        f.remote.seed_line(CatalogId::new(51), 1, Decimal::from(9));
        f.cart
            .add_line(LineCandidate::new(CatalogId::new(60), "Local").with_price(1_i64), 1)
            .await
            .unwrap();

        f.cart.clear().await;
        f.cart.hydrate().await;

        let ids: Vec<i64> = f
            .cart
            .items()
            .await
            .iter()
            .map(|l| l.catalog_id.as_i64())
            .collect();
        assert_eq!(ids, vec![50, 51]);
        let stored: Option<Cart> = load_json(f.store.as_ref(), keys::CART).await.unwrap();
        assert_eq!(stored.map(|c| c.len()), Some(2));
    }

    #[tokio::test]
    async fn test_hydrate_falls_back_to_storage() {
        let f = signed_in();
        let mut saved = Cart::new();
        saved.apply_add(LineCandidate::new(CatalogId::new(3), "Saved").with_price(2_i64), 2);
        crate::storage::save_json(f.store.as_ref(), keys::CART, &saved)
            .await
            .unwrap();
        f.remote.fail_all(true);

        f.cart.hydrate().await;

        assert_eq!(f.cart.cart().await, saved);
        assert!(f.cart.is_hydrated().await);
    }

    #[tokio::test]
    async fn test_hydrate_with_empty_remote_uses_storage() {
        let f = signed_in();
        let mut saved = Cart::new();
        saved.apply_add(LineCandidate::new(CatalogId::new(3), "Saved").with_price(2_i64), 2);
        crate::storage::save_json(f.store.as_ref(), keys::CART, &saved)
            .await
            .unwrap();

        f.cart.hydrate().await;

        assert_eq!(f.cart.cart().await, saved);
    }

    #[tokio::test]
    async fn test_guest_hydrate_without_snapshot_stays_empty() {
        let f = guest();
        f.cart.hydrate().await;
        assert!(f.cart.items().await.is_empty());
        assert!(f.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_every_change_is_persisted() {
        let f = guest();
        f.cart.hydrate().await;
        f.cart
            .add_line(LineCandidate::new(CatalogId::new(1), "x").with_price(3_i64), 2)
            .await
            .unwrap();

        let stored: Option<Cart> = load_json(f.store.as_ref(), keys::CART).await.unwrap();
        assert_eq!(stored.map(|c| c.count()), Some(2));

        f.cart.set_quantity(CatalogId::new(1), 5).await;
        let stored: Option<Cart> = load_json(f.store.as_ref(), keys::CART).await.unwrap();
        assert_eq!(stored.map(|c| c.count()), Some(5));
    }

    #[tokio::test]
    async fn test_custom_default_unit() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(FakeRemote::new());
        let cart = CartSynchronizer::new(
            store,
            Arc::new(StaticCredential::new("t")),
            remote.clone(),
        )
        .with_default_unit("pc");

        cart.add_line(mango(), 1).await.unwrap();
        assert_eq!(
            remote.created_lines().first().map(|l| l.unit_label.clone()),
            Some("pc".to_string())
        );
    }
}
