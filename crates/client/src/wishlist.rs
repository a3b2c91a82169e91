//! Wishlist kept on the device only.

use std::sync::Arc;

use tracing::{debug, instrument};

use cartsync_core::{CatalogId, Wishlist, WishlistItem};

use crate::snapshot::PersistedState;
use crate::storage::{KeyValueStore, keys};

pub struct WishlistSynchronizer {
    state: PersistedState<Wishlist>,
}

impl WishlistSynchronizer {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            state: PersistedState::new(store, keys::WISHLIST),
        }
    }

    pub async fn items(&self) -> Vec<WishlistItem> {
        self.state.with(|wishlist| wishlist.items().to_vec()).await
    }

    pub async fn contains(&self, catalog_id: CatalogId) -> bool {
        self.state.with(|wishlist| wishlist.contains(catalog_id)).await
    }

    pub async fn len(&self) -> usize {
        self.state.with(Wishlist::len).await
    }

    pub async fn is_empty(&self) -> bool {
        self.state.with(Wishlist::is_empty).await
    }

    /// Restore the stored wishlist.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) {
        match self.state.load_stored().await {
            Some(wishlist) => {
                debug!(count = wishlist.len(), "Hydrated wishlist from storage");
                self.state.hydrate_with(wishlist).await;
            }
            None => self.state.mark_hydrated().await,
        }
    }

    /// Add the item if absent, remove it if present.
    ///
    /// Returns whether the item is in the wishlist afterwards.
    #[instrument(skip(self, item), fields(catalog_id = %item.catalog_id))]
    pub async fn toggle(&self, item: WishlistItem) -> bool {
        self.state.mutate(|wishlist| wishlist.toggle(item)).await
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, catalog_id: CatalogId) -> Option<WishlistItem> {
        self.state.mutate(|wishlist| wishlist.remove(catalog_id)).await
    }

    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.state.mutate(Wishlist::clear).await;
    }
}
