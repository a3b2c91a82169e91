//! Storefront REST API client.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, one shared connection pool per client
//! - Responses are read as text, parsed as JSON, stripped of an optional
//!   `{ "data": ... }` envelope and decoded into core types here, so the
//!   synchronizers only ever see `CartLineItem` and `Address`
//! - The session token is passed per call as a bearer token; the client
//!   itself holds no credentials
//!
//! # Endpoints
//!
//! | Method | Path                          | Purpose               |
//! |--------|-------------------------------|-----------------------|
//! | GET    | `cart`                        | List cart lines       |
//! | POST   | `cart`                        | Create a cart line    |
//! | PUT    | `cart/{id}`                   | Change line quantity  |
//! | DELETE | `cart/{id}`                   | Delete a line         |
//! | GET    | `addresses`                   | List addresses        |
//! | POST   | `addresses`                   | Create an address     |
//! | PUT    | `addresses/{id}`              | Update an address     |
//! | DELETE | `addresses/{id}`              | Delete an address     |
//! | POST   | `addresses/{id}/set-default`  | Mark default address  |

mod conversions;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use cartsync_core::{Address, AddressDraft, AddressId, CartLineItem, RemoteLineId};

use crate::config::ApiConfig;
use crate::remote::{AddressResource, CartResource, NewCartLine};

pub use conversions::{convert_address, convert_cart_line, decode_list, unwrap_envelope};
use types::{AddressPayload, RemoteAddress, RemoteCartLine, UpdateQuantity};

/// Longest body excerpt kept in errors and logs.
const BODY_EXCERPT_CHARS: usize = 200;

/// Errors that can occur when calling the storefront API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The session token was rejected.
    #[error("Unauthorized: session token rejected")]
    Unauthorized,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront cart and address resources.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("cartsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// The base URL endpoints are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: &SecretString,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path)?;
        Ok(self
            .inner
            .client
            .request(method, url)
            .bearer_auth(token.expose_secret()))
    }

    /// Send a request and return the JSON body (`Null` for an empty body).
    async fn execute(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&response_text),
                "Storefront API returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: excerpt(&response_text),
            });
        }

        if response_text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&response_text),
                "Failed to parse storefront API response"
            );
            ApiError::Parse(e)
        })
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        token: &SecretString,
        body: &B,
    ) -> Result<Value, ApiError> {
        let request = self.request(method, path, token)?.json(body);
        self.execute(request).await
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

/// Whether a create response carried the created record.
///
/// An explicit `"success": false` counts as not created even on a 2xx. A
/// bare object needs an `id`; an enveloped one needs a non-empty `data`.
fn has_created_record(value: Value) -> bool {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return false;
    }
    let enveloped = value.get("data").is_some();
    match unwrap_envelope(value) {
        Value::Null => false,
        Value::Object(map) if enveloped => !map.is_empty(),
        Value::Object(map) => map.get("id").is_some_and(|id| !id.is_null()),
        Value::Array(items) => !items.is_empty(),
        _ => enveloped,
    }
}

// =============================================================================
// Cart
// =============================================================================

#[async_trait]
impl CartResource for ApiClient {
    #[instrument(skip(self, token))]
    async fn list_lines(&self, token: &SecretString) -> Result<Vec<CartLineItem>, ApiError> {
        let value = self.execute(self.request(Method::GET, "cart", token)?).await?;
        let lines: Vec<CartLineItem> = decode_list::<RemoteCartLine>(value, "cart")
            .into_iter()
            .filter_map(convert_cart_line)
            .collect();
        debug!(count = lines.len(), "Fetched remote cart");
        Ok(lines)
    }

    #[instrument(skip(self, token, line), fields(product_id = %line.product_id, quantity = line.quantity))]
    async fn create_line(
        &self,
        token: &SecretString,
        line: &NewCartLine,
    ) -> Result<bool, ApiError> {
        let value = self.send_json(Method::POST, "cart", token, line).await?;
        Ok(has_created_record(value))
    }

    #[instrument(skip(self, token), fields(line_id = %id))]
    async fn update_line(
        &self,
        token: &SecretString,
        id: RemoteLineId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.send_json(
            Method::PUT,
            &format!("cart/{id}"),
            token,
            &UpdateQuantity { quantity },
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(line_id = %id))]
    async fn delete_line(&self, token: &SecretString, id: RemoteLineId) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("cart/{id}"), token)?;
        self.execute(request).await?;
        Ok(())
    }
}

// =============================================================================
// Addresses
// =============================================================================

#[async_trait]
impl AddressResource for ApiClient {
    #[instrument(skip(self, token))]
    async fn list_addresses(&self, token: &SecretString) -> Result<Vec<Address>, ApiError> {
        let value = self
            .execute(self.request(Method::GET, "addresses", token)?)
            .await?;
        let addresses: Vec<Address> = decode_list::<RemoteAddress>(value, "addresses")
            .into_iter()
            .filter_map(convert_address)
            .collect();
        debug!(count = addresses.len(), "Fetched remote addresses");
        Ok(addresses)
    }

    #[instrument(skip(self, token, draft))]
    async fn create_address(
        &self,
        token: &SecretString,
        draft: &AddressDraft,
    ) -> Result<bool, ApiError> {
        let value = self
            .send_json(Method::POST, "addresses", token, &AddressPayload::from(draft))
            .await?;
        Ok(has_created_record(value))
    }

    #[instrument(skip(self, token, draft), fields(address_id = %id))]
    async fn update_address(
        &self,
        token: &SecretString,
        id: AddressId,
        draft: &AddressDraft,
    ) -> Result<(), ApiError> {
        self.send_json(
            Method::PUT,
            &format!("addresses/{id}"),
            token,
            &AddressPayload::from(draft),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(address_id = %id))]
    async fn delete_address(&self, token: &SecretString, id: AddressId) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("addresses/{id}"), token)?;
        self.execute(request).await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(address_id = %id))]
    async fn set_default_address(
        &self,
        token: &SecretString,
        id: AddressId,
    ) -> Result<(), ApiError> {
        let request = self.request(
            Method::POST,
            &format!("addresses/{id}/set-default"),
            token,
        )?;
        self.execute(request).await?;
        Ok(())
    }
}
