//! In-memory collection state mirrored to durable storage.
//!
//! Every synchronizer keeps its collection in a [`PersistedState`]. Each
//! change is written to the store under the collection's key, with one
//! exception: until the collection has been hydrated, an empty value is
//! never written, so a freshly started session cannot overwrite a saved
//! collection before it has been read back.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use cartsync_core::{AddressBook, Cart, Wishlist};

use crate::storage::{KeyValueStore, load_json, save_json};

/// A collection that can be stored as one snapshot.
pub trait Snapshot: Serialize + DeserializeOwned + Clone + Default + Send + Sync {
    fn is_empty(&self) -> bool;
}

impl Snapshot for Cart {
    fn is_empty(&self) -> bool {
        Self::is_empty(self)
    }
}

impl Snapshot for AddressBook {
    fn is_empty(&self) -> bool {
        Self::is_empty(self)
    }
}

impl Snapshot for Wishlist {
    fn is_empty(&self) -> bool {
        Self::is_empty(self)
    }
}

struct Tracked<T> {
    value: T,
    hydrated: bool,
}

/// A collection plus the store key it is mirrored to.
pub struct PersistedState<T> {
    key: &'static str,
    store: Arc<dyn KeyValueStore>,
    state: RwLock<Tracked<T>>,
    // Serializes store writes so the last write always carries the latest value
    write_lock: Mutex<()>,
}

impl<T: Snapshot> PersistedState<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            key,
            store,
            state: RwLock::new(Tracked {
                value: T::default(),
                hydrated: false,
            }),
            write_lock: Mutex::new(()),
        }
    }

    /// A copy of the current value.
    pub async fn snapshot(&self) -> T {
        self.state.read().await.value.clone()
    }

    /// Read the current value without copying it.
    pub async fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.read().await.value)
    }

    pub async fn is_hydrated(&self) -> bool {
        self.state.read().await.hydrated
    }

    /// Apply a change and persist the result.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = {
            let mut state = self.state.write().await;
            f(&mut state.value)
        };
        self.persist().await;
        result
    }

    /// Replace the whole value and persist it.
    pub async fn replace(&self, value: T) {
        self.state.write().await.value = value;
        self.persist().await;
    }

    /// Replace the whole value as the result of hydration.
    pub async fn hydrate_with(&self, value: T) {
        {
            let mut state = self.state.write().await;
            state.value = value;
            state.hydrated = true;
        }
        self.persist().await;
    }

    /// Mark hydration complete without changing the value.
    pub async fn mark_hydrated(&self) {
        self.state.write().await.hydrated = true;
    }

    /// Read the last stored snapshot. Unreadable snapshots count as absent.
    pub async fn load_stored(&self) -> Option<T> {
        match load_json::<T>(self.store.as_ref(), self.key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = self.key, error = %e, "Ignoring unreadable snapshot");
                None
            }
        }
    }

    /// Write the current value to the store.
    ///
    /// Store failures are logged; the in-memory value stays authoritative.
    pub async fn persist(&self) {
        let _guard = self.write_lock.lock().await;

        let value = {
            let state = self.state.read().await;
            if !state.hydrated && state.value.is_empty() {
                debug!(key = self.key, "Skipping empty snapshot before hydration");
                return;
            }
            state.value.clone()
        };

        if let Err(e) = save_json(self.store.as_ref(), self.key, &value).await {
            warn!(key = self.key, error = %e, "Failed to persist snapshot");
        }
    }

    /// Delete the stored snapshot.
    pub async fn forget_stored(&self) {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = self.store.remove(self.key).await {
            warn!(key = self.key, error = %e, "Failed to remove snapshot");
        }
    }
}
