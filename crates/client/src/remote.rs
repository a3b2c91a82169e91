//! Remote cart and address resources, as seen by the synchronizers.
//!
//! [`ApiClient`](crate::api::ApiClient) implements both traits over HTTP.
//! Responses are decoded into core types before they cross this boundary.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Serialize;

use cartsync_core::{
    Address, AddressDraft, AddressId, CartLineItem, CategoryId, ProductId, RemoteLineId,
};

use crate::api::ApiError;

/// Body of a cart line creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCartLine {
    pub category_id: CategoryId,
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(rename = "unit_type")]
    pub unit_label: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub delivery_charge: Decimal,
    pub delivery_date: NaiveDate,
}

/// The remote cart resource.
#[async_trait]
pub trait CartResource: Send + Sync {
    /// Fetch every line of the remote cart.
    async fn list_lines(&self, token: &SecretString) -> Result<Vec<CartLineItem>, ApiError>;

    /// Create a line. Returns whether the response carried the created record.
    async fn create_line(&self, token: &SecretString, line: &NewCartLine)
    -> Result<bool, ApiError>;

    /// Change the quantity of a line.
    async fn update_line(
        &self,
        token: &SecretString,
        id: RemoteLineId,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// Delete a line.
    async fn delete_line(&self, token: &SecretString, id: RemoteLineId) -> Result<(), ApiError>;
}

/// The remote address resource.
#[async_trait]
pub trait AddressResource: Send + Sync {
    async fn list_addresses(&self, token: &SecretString) -> Result<Vec<Address>, ApiError>;

    /// Create an address. Returns whether the response carried the created
    /// record.
    async fn create_address(
        &self,
        token: &SecretString,
        draft: &AddressDraft,
    ) -> Result<bool, ApiError>;

    async fn update_address(
        &self,
        token: &SecretString,
        id: AddressId,
        draft: &AddressDraft,
    ) -> Result<(), ApiError>;

    async fn delete_address(&self, token: &SecretString, id: AddressId) -> Result<(), ApiError>;

    async fn set_default_address(
        &self,
        token: &SecretString,
        id: AddressId,
    ) -> Result<(), ApiError>;
}
