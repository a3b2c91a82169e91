//! Subcommand handlers.
//!
//! Handlers write their results to stdout; logs go to stderr.

pub mod address;
pub mod auth;
pub mod cart;
pub mod wishlist;

use thiserror::Error;

use cartsync_client::{AddressSyncError, CartError, ClientError, StorageError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Address(#[from] AddressSyncError),

    /// Writing to stdout failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}
