//! Cartsync Core - Shared types library.
//!
//! This crate provides the domain types used across all cartsync components:
//! - `client` - Synchronizers, REST client and storage backends
//! - `cli` - Command-line front-end over a client session
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no storage access, no HTTP clients. The optimistic half of every cart and
//! address mutation lives here so it can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, cart lines, addresses and wishlist items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
