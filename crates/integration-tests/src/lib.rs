//! Integration test harness for cartsync.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartsync-integration-tests
//! ```
//!
//! [`FakeStorefront`] serves the storefront cart and address endpoints from
//! memory on an ephemeral port. Tests point the real `ApiClient` at it and
//! drive a `Session` end to end.
//!
//! The fake answers in the loose shapes real backends produce: ids as
//! strings, prices as decimal strings, product details nested under
//! `product`, flags as `0`/`1` and, unless disabled, a `{ "data": ... }`
//! envelope.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use cartsync_client::ApiConfig;

/// Token the fake accepts.
pub const VALID_TOKEN: &str = "test-token";

/// A cart line as held by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLine {
    pub id: i64,
    pub product_id: i64,
    pub category_id: i64,
    pub name: String,
    pub quantity: u64,
    pub price: String,
    pub unit_type: String,
    pub delivery_charge: String,
    pub delivery_date: String,
}

/// An address as held by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAddress {
    pub id: i64,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub address_type: String,
    pub is_default: bool,
}

#[derive(Default)]
struct Backend {
    lines: Vec<StoredLine>,
    addresses: Vec<StoredAddress>,
    requests: Vec<String>,
    bodies: Vec<Value>,
    next_id: i64,
    failing: bool,
    bare: bool,
}

impl Backend {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn wrap(&self, value: Value) -> Value {
        if self.bare { value } else { json!({ "data": value }) }
    }
}

type Shared = Arc<Mutex<Backend>>;

/// In-process storefront serving `/api/cart` and `/api/addresses`.
pub struct FakeStorefront {
    addr: SocketAddr,
    backend: Shared,
}

impl FakeStorefront {
    /// Bind an ephemeral port and start serving.
    pub async fn spawn() -> Self {
        let backend = Shared::default();
        let app = router(backend.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, backend }
    }

    /// API configuration pointing at this server.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&format!("http://{}/api", self.addr)).unwrap()
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }

    /// Answer every request with a 500.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Send responses without the `data` envelope.
    pub fn set_bare_responses(&self, bare: bool) {
        self.lock().bare = bare;
    }

    /// Put a line in the remote cart. Returns its remote id.
    pub fn seed_line(&self, product_id: i64, name: &str, quantity: u64, price: &str) -> i64 {
        let mut backend = self.lock();
        let id = backend.next_id();
        backend.lines.push(StoredLine {
            id,
            product_id,
            category_id: 1,
            name: name.to_string(),
            quantity,
            price: price.to_string(),
            unit_type: "kg".to_string(),
            delivery_charge: "0".to_string(),
            delivery_date: "2026-01-15".to_string(),
        });
        id
    }

    /// Put an address in the remote book. Returns its id.
    pub fn seed_address(&self, full_name: &str, is_default: bool) -> i64 {
        let mut backend = self.lock();
        let id = backend.next_id();
        if is_default {
            for address in &mut backend.addresses {
                address.is_default = false;
            }
        }
        backend.addresses.push(StoredAddress {
            id,
            full_name: full_name.to_string(),
            phone: "9876543210".to_string(),
            address: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            address_type: "home".to_string(),
            is_default,
        });
        id
    }

    #[must_use]
    pub fn lines(&self) -> Vec<StoredLine> {
        self.lock().lines.clone()
    }

    #[must_use]
    pub fn addresses(&self) -> Vec<StoredAddress> {
        self.lock().addresses.clone()
    }

    /// Every request seen so far, as `"METHOD /path"`.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.lock().requests.clone()
    }

    /// Requests other than `GET`s.
    #[must_use]
    pub fn mutations(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| !r.starts_with("GET "))
            .collect()
    }

    /// JSON bodies of every request that carried one.
    #[must_use]
    pub fn bodies(&self) -> Vec<Value> {
        self.lock().bodies.clone()
    }
}

fn router(backend: Shared) -> Router {
    Router::new()
        .route("/api/cart", get(list_cart).post(create_line))
        .route("/api/cart/{id}", put(update_line).delete(delete_line))
        .route("/api/addresses", get(list_addresses).post(create_address))
        .route(
            "/api/addresses/{id}",
            put(update_address).delete(delete_address),
        )
        .route("/api/addresses/{id}/set-default", post(set_default))
        .with_state(backend)
}

// =============================================================================
// Request gate
// =============================================================================

/// Record the request, then check the token and the failure switch.
fn admit<'a>(
    backend: &'a Shared,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Option<&Value>,
) -> Result<MutexGuard<'a, Backend>, Response> {
    let mut guard = backend.lock().unwrap();
    guard.requests.push(format!("{method} {}", uri.path()));
    if let Some(body) = body {
        guard.bodies.push(body.clone());
    }

    let expected = format!("Bearer {VALID_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthenticated."})))
            .into_response());
    }
    if guard.failing {
        return Err((StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response());
    }
    Ok(guard)
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"success": false, "message": "Not found"})))
        .into_response()
}

fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// =============================================================================
// Cart
// =============================================================================

fn render_line(line: &StoredLine) -> Value {
    json!({
        "id": line.id,
        "product_id": line.product_id.to_string(),
        "category_id": line.category_id,
        "quantity": line.quantity,
        "price": line.price,
        "unit_type": line.unit_type,
        "delivery_charge": line.delivery_charge,
        "delivery_date": format!("{}T00:00:00.000000Z", line.delivery_date),
        "product": {
            "id": line.product_id,
            "name": line.name,
            "price": line.price,
            "image": format!("https://cdn.example.com/p/{}.jpg", line.product_id),
        },
    })
}

async fn list_cart(
    State(backend): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let guard = match admit(&backend, &method, &uri, &headers, None) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let lines: Vec<Value> = guard.lines.iter().map(render_line).collect();
    Json(guard.wrap(Value::Array(lines))).into_response()
}

async fn create_line(
    State(backend): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = match admit(&backend, &method, &uri, &headers, Some(&body)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };

    let product_id = body.get("product_id").and_then(Value::as_i64).unwrap_or(0);
    let quantity = body.get("quantity").and_then(Value::as_u64).unwrap_or(1);

    let id = if let Some(existing) = guard.lines.iter_mut().find(|l| l.product_id == product_id) {
        existing.quantity += quantity;
        existing.id
    } else {
        let id = guard.next_id();
        let line = StoredLine {
            id,
            product_id,
            category_id: body.get("category_id").and_then(Value::as_i64).unwrap_or(0),
            name: format!("Product {product_id}"),
            quantity,
            price: text(&body, "price"),
            unit_type: text(&body, "unit_type"),
            delivery_charge: text(&body, "delivery_charge"),
            delivery_date: text(&body, "delivery_date"),
        };
        guard.lines.push(line);
        id
    };

    let data = guard.wrap(json!({ "id": id.to_string() }));
    (StatusCode::CREATED, Json(data)).into_response()
}

async fn update_line(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = match admit(&backend, &method, &uri, &headers, Some(&body)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let Some(line) = guard.lines.iter_mut().find(|l| l.id == id) else {
        return not_found();
    };
    line.quantity = body.get("quantity").and_then(Value::as_u64).unwrap_or(line.quantity);
    let rendered = render_line(line);
    Json(guard.wrap(rendered)).into_response()
}

async fn delete_line(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut guard = match admit(&backend, &method, &uri, &headers, None) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let before = guard.lines.len();
    guard.lines.retain(|l| l.id != id);
    if guard.lines.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// Addresses
// =============================================================================

fn render_address(address: &StoredAddress) -> Value {
    json!({
        "id": address.id.to_string(),
        "full_name": address.full_name,
        "phone": address.phone,
        "address": address.address,
        "city": address.city,
        "state": address.state,
        "pincode": address.pincode.parse::<i64>().map_or_else(|_| json!(address.pincode), |n| json!(n)),
        "address_type": address.address_type,
        "is_default": i32::from(address.is_default),
    })
}

fn address_from_body(id: i64, body: &Value) -> StoredAddress {
    StoredAddress {
        id,
        full_name: text(body, "full_name"),
        phone: text(body, "phone"),
        address: text(body, "address"),
        city: text(body, "city"),
        state: text(body, "state"),
        pincode: text(body, "pincode"),
        address_type: text(body, "address_type"),
        is_default: body.get("is_default").and_then(Value::as_bool).unwrap_or(false),
    }
}

fn make_default(addresses: &mut [StoredAddress], id: i64) {
    for address in addresses {
        address.is_default = address.id == id;
    }
}

async fn list_addresses(
    State(backend): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let guard = match admit(&backend, &method, &uri, &headers, None) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let addresses: Vec<Value> = guard.addresses.iter().map(render_address).collect();
    Json(guard.wrap(Value::Array(addresses))).into_response()
}

async fn create_address(
    State(backend): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = match admit(&backend, &method, &uri, &headers, Some(&body)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let id = guard.next_id();
    let address = address_from_body(id, &body);
    let is_default = address.is_default;
    guard.addresses.push(address);
    if is_default {
        make_default(&mut guard.addresses, id);
    }
    let data = guard.wrap(json!({ "id": id }));
    (StatusCode::CREATED, Json(data)).into_response()
}

async fn update_address(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut guard = match admit(&backend, &method, &uri, &headers, Some(&body)) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let Some(slot) = guard.addresses.iter_mut().find(|a| a.id == id) else {
        return not_found();
    };
    *slot = address_from_body(id, &body);
    if slot.is_default {
        make_default(&mut guard.addresses, id);
    }
    Json(json!({"success": true})).into_response()
}

async fn delete_address(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut guard = match admit(&backend, &method, &uri, &headers, None) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let before = guard.addresses.len();
    guard.addresses.retain(|a| a.id != id);
    if guard.addresses.len() == before {
        return not_found();
    }
    Json(json!({"success": true})).into_response()
}

async fn set_default(
    State(backend): State<Shared>,
    Path(id): Path<i64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let mut guard = match admit(&backend, &method, &uri, &headers, None) {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if !guard.addresses.iter().any(|a| a.id == id) {
        return not_found();
    }
    make_default(&mut guard.addresses, id);
    Json(json!({"success": true})).into_response()
}
