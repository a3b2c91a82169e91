//! Cart and address synchronization for storefront clients.
//!
//! A [`Session`] owns the cart, the address book and the wishlist. Every
//! collection lives in memory, is mirrored to a [`KeyValueStore`] on each
//! change and, while a session token is stored, is reconciled with the
//! storefront REST API through [`ApiClient`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod api;
pub mod cart;
pub mod config;
pub mod credentials;
pub mod error;
pub mod remote;
pub mod session;
pub mod snapshot;
pub mod storage;
pub mod wishlist;

#[cfg(test)]
mod testing;

pub use address::{AddressSyncError, AddressSynchronizer};
pub use api::{ApiClient, ApiError};
pub use cart::{CartError, CartSynchronizer};
pub use config::{ApiConfig, ClientConfig, ConfigError};
pub use credentials::{CredentialProvider, StaticCredential, StoredCredentials, SyncMode};
pub use error::ClientError;
pub use remote::{AddressResource, CartResource, NewCartLine};
pub use session::Session;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use wishlist::WishlistSynchronizer;
