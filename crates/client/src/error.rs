//! Umbrella error for callers that drive a whole session.

use thiserror::Error;

use crate::address::AddressSyncError;
use crate::api::ApiError;
use crate::cart::CartError;
use crate::config::ConfigError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Address(#[from] AddressSyncError),
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
