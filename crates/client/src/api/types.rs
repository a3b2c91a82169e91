//! Wire types for the storefront REST API.
//!
//! The backend is loose about shapes: numbers sometimes arrive as strings,
//! flags as `0`/`1`, and product details either inline or nested under
//! `product`. These types accept every observed variant; the
//! [`conversions`](super::conversions) module decides precedence once.

use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use cartsync_core::{AddressDraft, AddressType};

/// A number that may be sent as JSON number or numeric string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Number(serde_json::Number),
    Text(String),
}

impl WireNumber {
    /// Decimal value, if the wire value is numeric.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        let text = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        };
        Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .ok()
    }

    /// Integer value, truncating any fraction.
    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        self.to_decimal().and_then(|d| d.trunc().to_i64())
    }
}

/// Free text that may be sent as a JSON number (phones, pincodes).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireText {
    Text(String),
    Number(serde_json::Number),
}

impl WireText {
    #[must_use]
    pub fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// A flag that may be sent as bool, number or string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WireBool {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl WireBool {
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0,
            Self::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Product details nested in a cart line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteProduct {
    #[serde(default)]
    pub id: Option<WireNumber>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<WireNumber>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category_id: Option<WireNumber>,
    #[serde(default)]
    pub unit_type: Option<String>,
}

/// A cart line as returned by `GET /cart`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCartLine {
    pub id: WireNumber,
    #[serde(default)]
    pub product_id: Option<WireNumber>,
    #[serde(default)]
    pub product: Option<RemoteProduct>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub quantity: Option<WireNumber>,
    #[serde(default)]
    pub price: Option<WireNumber>,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub category_id: Option<WireNumber>,
    #[serde(default)]
    pub delivery_charge: Option<WireNumber>,
    #[serde(default)]
    pub delivery_date: Option<String>,
}

/// Body of `PUT /cart/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateQuantity {
    pub quantity: u32,
}

// =============================================================================
// Addresses
// =============================================================================

/// An address as returned by `GET /addresses`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAddress {
    pub id: WireNumber,
    #[serde(default, alias = "name")]
    pub full_name: Option<String>,
    #[serde(default, alias = "mobile")]
    pub phone: Option<WireText>,
    #[serde(default, alias = "address_line")]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, alias = "zip")]
    pub pincode: Option<WireText>,
    #[serde(default, alias = "type")]
    pub address_type: Option<String>,
    #[serde(default)]
    pub is_default: Option<WireBool>,
}

/// Body of `POST /addresses` and `PUT /addresses/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct AddressPayload<'a> {
    pub full_name: &'a str,
    pub phone: &'a str,
    pub address: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub pincode: &'a str,
    pub address_type: AddressType,
    pub is_default: bool,
}

impl<'a> From<&'a AddressDraft> for AddressPayload<'a> {
    fn from(draft: &'a AddressDraft) -> Self {
        Self {
            full_name: draft.full_name.trim(),
            phone: draft.phone.trim(),
            address: draft.address.trim(),
            city: draft.city.trim(),
            state: draft.state.trim(),
            pincode: draft.pincode.trim(),
            address_type: draft.address_type,
            is_default: draft.is_default,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_number_variants() {
        let n: WireNumber = serde_json::from_str("25").unwrap();
        assert_eq!(n.to_decimal(), Some(Decimal::from(25)));

        let s: WireNumber = serde_json::from_str("\"42.50\"").unwrap();
        assert_eq!(s.to_decimal(), Some(Decimal::new(4250, 2)));

        let f: WireNumber = serde_json::from_str("2.9").unwrap();
        assert_eq!(f.to_i64(), Some(2));

        let bad: WireNumber = serde_json::from_str("\"n/a\"").unwrap();
        assert_eq!(bad.to_decimal(), None);
    }

    #[test]
    fn test_wire_bool_variants() {
        for (json, expected) in [("true", true), ("0", false), ("1", true), ("\"yes\"", true), ("\"false\"", false)] {
            let flag: WireBool = serde_json::from_str(json).unwrap();
            assert_eq!(flag.as_bool(), expected, "{json}");
        }
    }

    #[test]
    fn test_remote_address_aliases() {
        let address: RemoteAddress = serde_json::from_str(
            r#"{"id": 3, "name": "Asha", "mobile": 9876543210, "zip": 411001, "type": "work"}"#,
        )
        .unwrap();
        assert_eq!(address.full_name.as_deref(), Some("Asha"));
        assert_eq!(address.phone.map(WireText::into_string).as_deref(), Some("9876543210"));
        assert_eq!(address.pincode.map(WireText::into_string).as_deref(), Some("411001"));
        assert_eq!(address.address_type.as_deref(), Some("work"));
    }
}
