//! Decoding of wire records into core types.
//!
//! Field precedence is fixed here and nowhere else:
//!
//! | Field          | First choice              | Fallback                   |
//! |----------------|---------------------------|----------------------------|
//! | catalog id     | `product_id`              | `product.id`               |
//! | display name   | `product.name`            | `name`, then `Product {id}`|
//! | unit price     | `price`                   | `product.price`, then 0    |
//! | image          | `product.image`           | `image`                    |
//! | unit label     | `unit_type`               | `product.unit_type`        |
//! | category id    | `category_id`             | `product.category_id`      |

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use cartsync_core::{
    Address, AddressId, AddressType, CartLineItem, CatalogId, CategoryId, ProductId, RemoteLineId,
};

use super::types::{RemoteAddress, RemoteCartLine, WireNumber, WireText};

/// Strip an optional `{ "data": ... }` envelope.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decode a list response, skipping entries that do not fit `T`.
pub fn decode_list<T: DeserializeOwned>(value: Value, what: &str) -> Vec<T> {
    let items = match unwrap_envelope(value) {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        other => {
            warn!(what, kind = value_kind(&other), "Expected a list response");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(what, error = %e, "Skipping undecodable record");
                None
            }
        })
        .collect()
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn number_to_id(n: Option<&WireNumber>) -> Option<i64> {
    n.and_then(WireNumber::to_i64)
}

/// Parse a `YYYY-MM-DD` prefix, tolerating a trailing time component.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let prefix = text.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Convert a remote cart line into a cart line item.
///
/// Returns `None` (with a warning) if no catalog id can be determined.
pub fn convert_cart_line(line: RemoteCartLine) -> Option<CartLineItem> {
    let product = line.product.unwrap_or_default();

    let Some(remote_id) = line.id.to_i64() else {
        warn!("Skipping cart line with non-numeric id");
        return None;
    };

    let Some(catalog_id) = number_to_id(line.product_id.as_ref()).or_else(|| number_to_id(product.id.as_ref())) else {
        warn!(remote_id, "Skipping cart line without a product id");
        return None;
    };

    let quantity = line
        .quantity
        .as_ref()
        .and_then(WireNumber::to_i64)
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or(1);

    let unit_price = line
        .price
        .as_ref()
        .and_then(WireNumber::to_decimal)
        .or_else(|| product.price.as_ref().and_then(WireNumber::to_decimal))
        .unwrap_or(Decimal::ZERO);

    let display_name = product
        .name
        .or(line.name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("Product {catalog_id}"));

    let category_id = number_to_id(line.category_id.as_ref())
        .or_else(|| number_to_id(product.category_id.as_ref()))
        .map(CategoryId::new);

    Some(CartLineItem {
        catalog_id: CatalogId::new(catalog_id),
        display_name,
        unit_price,
        quantity,
        image_ref: product.image.or(line.image),
        unit_label: line.unit_type.or(product.unit_type),
        category_id,
        product_id: Some(ProductId::new(catalog_id)),
        remote_line_id: Some(RemoteLineId::new(remote_id)),
        delivery_charge: line.delivery_charge.as_ref().and_then(WireNumber::to_decimal),
        delivery_date: line.delivery_date.as_deref().and_then(parse_date),
    })
}

/// Convert a remote address into an address.
///
/// Returns `None` (with a warning) if the id is not numeric.
pub fn convert_address(address: RemoteAddress) -> Option<Address> {
    let Some(id) = address.id.to_i64() else {
        warn!("Skipping address with non-numeric id");
        return None;
    };

    let address_type = address
        .address_type
        .as_deref()
        .and_then(|t| t.parse::<AddressType>().ok())
        .unwrap_or(AddressType::Other);

    Some(Address {
        id: AddressId::new(id),
        remote_id: Some(AddressId::new(id)),
        full_name: address.full_name.unwrap_or_default(),
        phone: address.phone.map(WireText::into_string).unwrap_or_default(),
        address: address.address.unwrap_or_default(),
        city: address.city.unwrap_or_default(),
        state: address.state.unwrap_or_default(),
        pincode: address.pincode.map(WireText::into_string).unwrap_or_default(),
        address_type,
        is_default: address.is_default.is_some_and(|flag| flag.as_bool()),
    })
}
