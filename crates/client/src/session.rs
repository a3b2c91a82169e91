//! A signed-in or guest shopping session.
//!
//! The session owns the three collections and the handles they share: one
//! store, one credential source and one remote client. Create it with
//! [`Session::start`], which hydrates everything before returning.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument};

use crate::address::AddressSynchronizer;
use crate::api::ApiClient;
use crate::cart::CartSynchronizer;
use crate::config::ClientConfig;
use crate::credentials::{CredentialProvider, StoredCredentials, SyncMode};
use crate::error::Result;
use crate::remote::{AddressResource, CartResource};
use crate::storage::{FileStore, KeyValueStore, StorageError};
use crate::wishlist::WishlistSynchronizer;

pub struct Session {
    credentials: Arc<StoredCredentials>,
    cart: CartSynchronizer,
    addresses: AddressSynchronizer,
    wishlist: WishlistSynchronizer,
}

impl Session {
    /// Build a session without hydrating it.
    #[must_use]
    pub fn from_parts<R>(store: Arc<dyn KeyValueStore>, remote: Arc<R>, default_unit: &str) -> Self
    where
        R: CartResource + AddressResource + 'static,
    {
        let credentials = Arc::new(StoredCredentials::new(store.clone()));
        let provider: Arc<dyn CredentialProvider> = credentials.clone();

        Self {
            cart: CartSynchronizer::new(store.clone(), provider.clone(), remote.clone())
                .with_default_unit(default_unit),
            addresses: AddressSynchronizer::new(store.clone(), provider, remote),
            wishlist: WishlistSynchronizer::new(store),
            credentials,
        }
    }

    /// Build and hydrate a session.
    pub async fn start<R>(store: Arc<dyn KeyValueStore>, remote: Arc<R>, default_unit: &str) -> Self
    where
        R: CartResource + AddressResource + 'static,
    {
        let session = Self::from_parts(store, remote, default_unit);
        session.hydrate().await;
        session
    }

    /// Build and hydrate a session backed by files under the configured data
    /// directory and the configured REST API.
    ///
    /// A token in the configuration replaces any stored one.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the token
    /// cannot be stored.
    pub async fn from_config(config: &ClientConfig) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.data_dir));
        let remote = Arc::new(ApiClient::new(&config.api)?);

        if let Some(token) = &config.auth_token {
            StoredCredentials::new(store.clone()).set_token(token).await?;
        }

        Ok(Self::start(store, remote, &config.api.default_unit).await)
    }

    /// Hydrate every collection.
    pub async fn hydrate(&self) {
        tokio::join!(
            self.cart.hydrate(),
            self.addresses.hydrate(),
            self.wishlist.hydrate()
        );
    }

    #[must_use]
    pub const fn cart(&self) -> &CartSynchronizer {
        &self.cart
    }

    #[must_use]
    pub const fn addresses(&self) -> &AddressSynchronizer {
        &self.addresses
    }

    #[must_use]
    pub const fn wishlist(&self) -> &WishlistSynchronizer {
        &self.wishlist
    }

    /// Whether mutations are currently mirrored to the remote API.
    pub async fn is_signed_in(&self) -> bool {
        SyncMode::resolve(self.credentials.as_ref())
            .await
            .is_synchronized()
    }

    /// Store the session token and re-hydrate from the remote API.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored.
    #[instrument(skip(self, token))]
    pub async fn login(&self, token: SecretString) -> std::result::Result<(), StorageError> {
        self.credentials.set_token(&token).await?;
        info!("Signed in");
        self.hydrate().await;
        Ok(())
    }

    /// Forget the session token and the user's addresses.
    ///
    /// The cart and wishlist stay on the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be removed.
    #[instrument(skip(self))]
    pub async fn logout(self) -> std::result::Result<(), StorageError> {
        self.credentials.clear_token().await?;
        self.addresses.clear().await;
        info!("Signed out");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cartsync_core::{AddressDraft, AddressType, CatalogId, CategoryId, LineCandidate, ProductId};
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::{MemoryStore, keys};
    use crate::testing::{FakeRemote, RemoteCall};

    fn draft() -> AddressDraft {
        AddressDraft {
            full_name: "Asha".to_string(),
            phone: "9876543210".to_string(),
            address: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            address_type: AddressType::Home,
            is_default: true,
        }
    }

    #[tokio::test]
    async fn test_guest_session_never_calls_remote() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(FakeRemote::new());
        let session = Session::start(store, remote.clone(), "kg").await;

        assert!(!session.is_signed_in().await);
        session
            .cart()
            .add_line(
                LineCandidate::new(CatalogId::new(1), "Rice")
                    .with_price(40_i64)
                    .with_remote_keys(CategoryId::new(1), ProductId::new(1)),
                1,
            )
            .await
            .unwrap();
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_login_hydrates_remote_collections() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(FakeRemote::new());
        remote.seed_line(CatalogId::new(5), 2, Decimal::from(30));
        remote.seed_address(draft());

        let session = Session::start(store.clone(), remote.clone(), "kg").await;
        assert!(session.cart().items().await.is_empty());

        session.login(SecretString::from("tok")).await.unwrap();

        assert!(session.is_signed_in().await);
        assert_eq!(session.cart().count().await, 2);
        assert_eq!(session.addresses().addresses().await.len(), 1);
        assert!(session.addresses().selected().await.is_some());
        assert!(remote.calls().contains(&RemoteCall::ListLines));
        assert!(store.get(keys::AUTH_TOKEN).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_logout_clears_user_data_but_keeps_cart() {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(FakeRemote::new());
        remote.seed_line(CatalogId::new(5), 2, Decimal::from(30));
        remote.seed_address(draft());

        let session = Session::start(store.clone(), remote.clone(), "kg").await;
        session.login(SecretString::from("tok")).await.unwrap();
        session.logout().await.unwrap();

        let session = Session::start(store.clone(), remote, "kg").await;
        assert!(!session.is_signed_in().await);
        assert!(session.addresses().addresses().await.is_empty());
        assert_eq!(session.addresses().selected().await, None);
        assert_eq!(session.cart().count().await, 2);
        assert_eq!(store.get(keys::AUTH_TOKEN).await.unwrap(), None);
    }
}
