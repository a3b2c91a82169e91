//! Address book synchronizer.
//!
//! Same reconciliation rules as the cart: local change first, remote call
//! when a credential is present, wholesale re-fetch after a successful call.
//! Update, delete and set-default only reach the remote for addresses it has
//! acknowledged; local-only addresses change locally.
//! On top of the book it tracks which address is selected for delivery,
//! persisted under its own key.

use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use cartsync_core::{Address, AddressBook, AddressDraft, AddressError, AddressId};

use crate::credentials::{CredentialProvider, SyncMode};
use crate::remote::AddressResource;
use crate::snapshot::PersistedState;
use crate::storage::{KeyValueStore, keys, load_json, save_json};

/// Errors surfaced to the caller of an address mutation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressSyncError {
    /// The draft failed validation.
    #[error("Invalid address: {0}")]
    Invalid(#[from] AddressError),

    /// No address with this id is in the book.
    #[error("Address {0} not found")]
    NotFound(AddressId),
}

/// Owner of the session's address book and delivery selection.
pub struct AddressSynchronizer {
    state: PersistedState<AddressBook>,
    selected: RwLock<Option<AddressId>>,
    store: Arc<dyn KeyValueStore>,
    credentials: Arc<dyn CredentialProvider>,
    remote: Arc<dyn AddressResource>,
}

impl AddressSynchronizer {
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        credentials: Arc<dyn CredentialProvider>,
        remote: Arc<dyn AddressResource>,
    ) -> Self {
        Self {
            state: PersistedState::new(store.clone(), keys::ADDRESSES),
            selected: RwLock::new(None),
            store,
            credentials,
            remote,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn book(&self) -> AddressBook {
        self.state.snapshot().await
    }

    pub async fn addresses(&self) -> Vec<Address> {
        self.state.with(|book| book.addresses().to_vec()).await
    }

    /// The address currently selected for delivery.
    pub async fn selected(&self) -> Option<Address> {
        let id = (*self.selected.read().await)?;
        self.state.with(|book| book.get(id).cloned()).await
    }

    pub async fn selected_id(&self) -> Option<AddressId> {
        *self.selected.read().await
    }

    pub async fn is_hydrated(&self) -> bool {
        self.state.is_hydrated().await
    }

    // =========================================================================
    // Hydration
    // =========================================================================

    /// Load the book from the remote resource or, failing that, from storage,
    /// then restore the selection.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) {
        self.hydrate_book().await;

        let stored = match load_json::<AddressId>(self.store.as_ref(), keys::SELECTED_ADDRESS).await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable address selection");
                None
            }
        };
        *self.selected.write().await = stored;
        self.resolve_selection().await;
    }

    async fn hydrate_book(&self) {
        if let SyncMode::Synchronized(token) = SyncMode::resolve(self.credentials.as_ref()).await {
            match self.remote.list_addresses(&token).await {
                Ok(addresses) if !addresses.is_empty() => {
                    debug!(count = addresses.len(), "Hydrated addresses from remote");
                    self.state
                        .hydrate_with(AddressBook::from_addresses(addresses))
                        .await;
                    return;
                }
                Ok(_) => debug!("Remote address list is empty, falling back to stored addresses"),
                Err(e) => warn!(error = %e, "Failed to fetch remote addresses, falling back to stored addresses"),
            }
        }

        match self.state.load_stored().await {
            Some(book) => {
                debug!(count = book.len(), "Hydrated addresses from storage");
                self.state.hydrate_with(book).await;
            }
            None => self.state.mark_hydrated().await,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Validate and add an address.
    ///
    /// # Errors
    ///
    /// Returns `AddressSyncError::Invalid` if the draft fails validation.
    /// Nothing is changed in that case.
    #[instrument(skip(self, draft))]
    pub async fn add_address(&self, draft: AddressDraft) -> Result<(), AddressSyncError> {
        draft.validate()?;

        let seed = Utc::now().timestamp_millis();
        self.state
            .mutate(|book| {
                let id = book.unused_id(seed);
                book.push(draft.clone().into_address(id));
            })
            .await;

        if let SyncMode::Synchronized(token) = SyncMode::resolve(self.credentials.as_ref()).await {
            match self.remote.create_address(&token, &draft).await {
                Ok(true) => {
                    self.reload(&token).await;
                }
                Ok(false) => debug!("Create response carried no record, keeping local address"),
                Err(e) => warn!(error = %e, "Failed to create remote address, keeping local address"),
            }
        }

        self.resolve_selection().await;
        Ok(())
    }

    /// Validate and replace the fields of an address.
    ///
    /// # Errors
    ///
    /// Returns `AddressSyncError::Invalid` for a bad draft and
    /// `AddressSyncError::NotFound` for an unknown id.
    #[instrument(skip(self, draft))]
    pub async fn update_address(
        &self,
        id: AddressId,
        draft: AddressDraft,
    ) -> Result<(), AddressSyncError> {
        draft.validate()?;

        let updated = self.state.mutate(|book| book.update(id, draft.clone())).await;
        if !updated {
            return Err(AddressSyncError::NotFound(id));
        }

        let mode = SyncMode::resolve(self.credentials.as_ref()).await;
        if let (Some(token), Some(remote_id)) = (mode.token(), self.remote_id(id).await) {
            match self.remote.update_address(token, remote_id, &draft).await {
                Ok(()) => {
                    self.reload(token).await;
                }
                Err(e) => warn!(error = %e, "Failed to update remote address, keeping local change"),
            }
        }

        self.resolve_selection().await;
        Ok(())
    }

    /// Remove an address.
    ///
    /// # Errors
    ///
    /// Returns `AddressSyncError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn remove_address(&self, id: AddressId) -> Result<(), AddressSyncError> {
        if !self.state.with(|book| book.contains(id)).await {
            return Err(AddressSyncError::NotFound(id));
        }

        let mut reloaded = false;
        let mode = SyncMode::resolve(self.credentials.as_ref()).await;
        if let (Some(token), Some(remote_id)) = (mode.token(), self.remote_id(id).await) {
            match self.remote.delete_address(token, remote_id).await {
                Ok(()) => reloaded = self.reload(token).await,
                Err(e) => warn!(error = %e, "Failed to delete remote address, removing locally"),
            }
        }
        if !reloaded {
            self.state.mutate(|book| book.remove(id)).await;
        }

        self.resolve_selection().await;
        Ok(())
    }

    /// Make an address the only default one.
    ///
    /// # Errors
    ///
    /// Returns `AddressSyncError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn set_default(&self, id: AddressId) -> Result<(), AddressSyncError> {
        if !self.state.mutate(|book| book.set_default(id)).await {
            return Err(AddressSyncError::NotFound(id));
        }

        let mode = SyncMode::resolve(self.credentials.as_ref()).await;
        if let (Some(token), Some(remote_id)) = (mode.token(), self.remote_id(id).await) {
            match self.remote.set_default_address(token, remote_id).await {
                Ok(()) => {
                    self.reload(token).await;
                }
                Err(e) => warn!(error = %e, "Failed to set remote default address, keeping local change"),
            }
        }

        self.resolve_selection().await;
        Ok(())
    }

    /// Select an address for delivery.
    ///
    /// # Errors
    ///
    /// Returns `AddressSyncError::NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn select(&self, id: AddressId) -> Result<(), AddressSyncError> {
        if !self.state.with(|book| book.contains(id)).await {
            return Err(AddressSyncError::NotFound(id));
        }
        *self.selected.write().await = Some(id);
        self.persist_selection(Some(id)).await;
        Ok(())
    }

    /// Empty the book and drop the selection. Local only.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        self.state.mutate(AddressBook::clear).await;
        *self.selected.write().await = None;
        self.persist_selection(None).await;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// The server-side id of an address. `None` for unknown and local-only
    /// addresses, which are never sent to the remote.
    async fn remote_id(&self, id: AddressId) -> Option<AddressId> {
        self.state
            .with(|book| book.get(id).and_then(|a| a.remote_id))
            .await
    }

    async fn reload(&self, token: &SecretString) -> bool {
        match self.remote.list_addresses(token).await {
            Ok(addresses) => {
                self.state
                    .replace(AddressBook::from_addresses(addresses))
                    .await;
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to re-fetch remote addresses");
                false
            }
        }
    }

    /// Keep the selection pointing at an existing address, falling back to
    /// the default one, then the first one.
    async fn resolve_selection(&self) {
        if !self.state.is_hydrated().await {
            return;
        }

        let current = *self.selected.read().await;
        let resolved = self
            .state
            .with(|book| match current {
                Some(id) if book.contains(id) => Some(id),
                _ => book.preferred().map(|a| a.id),
            })
            .await;

        if resolved != current {
            debug!(?current, ?resolved, "Address selection changed");
            *self.selected.write().await = resolved;
            self.persist_selection(resolved).await;
        }
    }

    async fn persist_selection(&self, id: Option<AddressId>) {
        let result = match id {
            Some(id) => save_json(self.store.as_ref(), keys::SELECTED_ADDRESS, &id).await,
            None => self.store.remove(keys::SELECTED_ADDRESS).await,
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist address selection");
        }
    }
}
