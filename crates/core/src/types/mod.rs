//! Core types for cartsync.
//!
//! This module provides type-safe wrappers for the storefront's client-side
//! collections.

pub mod address;
pub mod cart;
pub mod id;
pub mod price;
pub mod wishlist;

pub use address::{Address, AddressBook, AddressDraft, AddressError, AddressType};
pub use cart::{Cart, CartLineItem, LineCandidate, OptimisticAdd};
pub use id::*;
pub use price::{PriceError, PriceInput, display_amount};
pub use wishlist::{Wishlist, WishlistItem};
