//! Delivery addresses and the address book transitions.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::AddressId;

/// Errors that can occur when validating an [`AddressDraft`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// A required field is blank.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),
    /// The phone number is not ten digits.
    #[error("phone number must have 10 digits")]
    InvalidPhone,
    /// The pincode is not six digits.
    #[error("pincode must have 6 digits")]
    InvalidPincode,
}

/// Kind of address, as labelled by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    #[default]
    Home,
    Work,
    #[serde(other)]
    Other,
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "home"),
            Self::Work => write!(f, "work"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl core::str::FromStr for AddressType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "work" | "office" => Ok(Self::Work),
            "other" => Ok(Self::Other),
            _ => Err(format!("invalid address type: {s}")),
        }
    }
}

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    /// Server-side id, once the remote has acknowledged the address.
    #[serde(default)]
    pub remote_id: Option<AddressId>,
    pub full_name: String,
    pub phone: String,
    /// Street address lines.
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub address_type: AddressType,
    #[serde(default)]
    pub is_default: bool,
}

/// User-entered address fields, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressDraft {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub address_type: AddressType,
    pub is_default: bool,
}

impl AddressDraft {
    /// Validate the draft.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is blank, the phone number does
    /// not have ten digits or the pincode does not have six digits.
    pub fn validate(&self) -> Result<(), AddressError> {
        for (name, value) in [
            ("full name", &self.full_name),
            ("address", &self.address),
            ("city", &self.city),
            ("state", &self.state),
        ] {
            if value.trim().is_empty() {
                return Err(AddressError::EmptyField(name));
            }
        }

        if digits_only(&self.phone).len() != 10 {
            return Err(AddressError::InvalidPhone);
        }

        let pincode = self.pincode.trim();
        if pincode.len() != 6 || !pincode.chars().all(|c| c.is_ascii_digit()) {
            return Err(AddressError::InvalidPincode);
        }

        Ok(())
    }

    /// Turn the draft into a local-only address with the given id.
    #[must_use]
    pub fn into_address(self, id: AddressId) -> Address {
        Address {
            id,
            remote_id: None,
            full_name: self.full_name.trim().to_string(),
            phone: digits_only(&self.phone),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            pincode: self.pincode.trim().to_string(),
            address_type: self.address_type,
            is_default: self.is_default,
        }
    }

    /// Turn the draft into an address the remote knows under `id`.
    #[must_use]
    pub fn into_remote_address(self, id: AddressId) -> Address {
        Address {
            remote_id: Some(id),
            ..self.into_address(id)
        }
    }
}

impl From<&Address> for AddressDraft {
    fn from(address: &Address) -> Self {
        Self {
            full_name: address.full_name.clone(),
            phone: address.phone.clone(),
            address: address.address.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            pincode: address.pincode.clone(),
            address_type: address.address_type,
            is_default: address.is_default,
        }
    }
}

/// Keep the last ten digits of a phone number, dropping separators and a
/// country prefix.
fn digits_only(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() > 10 && phone.trim_start().starts_with('+') {
        digits.chars().skip(digits.len() - 10).collect()
    } else {
        digits
    }
}

/// Ordered address list with at most one default entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook {
    addresses: Vec<Address>,
}

impl AddressBook {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            addresses: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_addresses(addresses: Vec<Address>) -> Self {
        Self { addresses }
    }

    #[must_use]
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: AddressId) -> Option<&Address> {
        self.addresses.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: AddressId) -> bool {
        self.get(id).is_some()
    }

    /// The default address, or the first one if none is flagged.
    #[must_use]
    pub fn preferred(&self) -> Option<&Address> {
        self.addresses
            .iter()
            .find(|a| a.is_default)
            .or_else(|| self.addresses.first())
    }

    /// An id not used by any address, derived from `seed`.
    ///
    /// Local-only addresses are keyed by a creation timestamp; collisions are
    /// resolved by counting upwards.
    #[must_use]
    pub fn unused_id(&self, seed: i64) -> AddressId {
        let mut candidate = seed;
        while self.contains(AddressId::new(candidate)) {
            candidate = candidate.saturating_add(1);
        }
        AddressId::new(candidate)
    }

    /// Append an address. A default address clears the flag on all others.
    pub fn push(&mut self, address: Address) {
        let id = address.id;
        let is_default = address.is_default;
        self.addresses.push(address);
        if is_default {
            self.set_default(id);
        }
    }

    /// Replace the fields of an address, keeping its local and remote ids.
    ///
    /// Returns `false` if no address has that id.
    pub fn update(&mut self, id: AddressId, draft: AddressDraft) -> bool {
        let is_default = draft.is_default;
        let Some(slot) = self.addresses.iter_mut().find(|a| a.id == id) else {
            return false;
        };
        *slot = Address {
            remote_id: slot.remote_id,
            ..draft.into_address(id)
        };
        if is_default {
            self.set_default(id);
        }
        true
    }

    pub fn remove(&mut self, id: AddressId) -> Option<Address> {
        let index = self.addresses.iter().position(|a| a.id == id)?;
        Some(self.addresses.remove(index))
    }

    /// Flag `id` as the default and clear the flag everywhere else.
    ///
    /// Returns `false` (and changes nothing) if no address has that id.
    pub fn set_default(&mut self, id: AddressId) -> bool {
        if !self.contains(id) {
            return false;
        }
        for address in &mut self.addresses {
            address.is_default = address.id == id;
        }
        true
    }

    pub fn clear(&mut self) {
        self.addresses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str) -> AddressDraft {
        AddressDraft {
            full_name: name.to_string(),
            phone: "98765 43210".to_string(),
            address: "12 MG Road".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            address_type: AddressType::Home,
            is_default: false,
        }
    }

    #[test]
    fn test_validate_accepts_complete_draft() {
        assert!(draft("Asha").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_name() {
        assert_eq!(
            draft("  ").validate(),
            Err(AddressError::EmptyField("full name"))
        );
    }

    #[test]
    fn test_validate_phone() {
        let mut d = draft("Asha");
        d.phone = "12345".to_string();
        assert_eq!(d.validate(), Err(AddressError::InvalidPhone));

        d.phone = "+91 98765-43210".to_string();
        assert!(d.validate().is_ok());
        assert_eq!(d.into_address(AddressId::new(1)).phone, "9876543210");
    }

    #[test]
    fn test_validate_pincode() {
        let mut d = draft("Asha");
        d.pincode = "4110".to_string();
        assert_eq!(d.validate(), Err(AddressError::InvalidPincode));
        d.pincode = "41100a".to_string();
        assert_eq!(d.validate(), Err(AddressError::InvalidPincode));
    }

    #[test]
    fn test_set_default_is_exclusive() {
        let mut book = AddressBook::new();
        let mut first = draft("A");
        first.is_default = true;
        book.push(first.into_address(AddressId::new(1)));
        book.push(draft("B").into_address(AddressId::new(2)));
        book.push(draft("C").into_address(AddressId::new(3)));

        assert!(book.set_default(AddressId::new(3)));
        let defaults: Vec<i64> = book
            .addresses()
            .iter()
            .filter(|a| a.is_default)
            .map(|a| a.id.as_i64())
            .collect();
        assert_eq!(defaults, vec![3]);
    }

    #[test]
    fn test_set_default_unknown_id_changes_nothing() {
        let mut book = AddressBook::new();
        let mut first = draft("A");
        first.is_default = true;
        book.push(first.into_address(AddressId::new(1)));

        assert!(!book.set_default(AddressId::new(9)));
        assert_eq!(book.preferred().map(|a| a.id), Some(AddressId::new(1)));
    }

    #[test]
    fn test_push_default_clears_others() {
        let mut book = AddressBook::new();
        let mut first = draft("A");
        first.is_default = true;
        book.push(first.into_address(AddressId::new(1)));
        let mut second = draft("B");
        second.is_default = true;
        book.push(second.into_address(AddressId::new(2)));

        assert_eq!(book.preferred().map(|a| a.id), Some(AddressId::new(2)));
        assert!(!book.get(AddressId::new(1)).is_some_and(|a| a.is_default));
    }

    #[test]
    fn test_preferred_falls_back_to_first() {
        let mut book = AddressBook::new();
        book.push(draft("A").into_address(AddressId::new(5)));
        book.push(draft("B").into_address(AddressId::new(6)));
        assert_eq!(book.preferred().map(|a| a.id), Some(AddressId::new(5)));
    }

    #[test]
    fn test_unused_id_skips_taken() {
        let mut book = AddressBook::new();
        book.push(draft("A").into_address(AddressId::new(100)));
        book.push(draft("B").into_address(AddressId::new(101)));
        assert_eq!(book.unused_id(100), AddressId::new(102));
        assert_eq!(book.unused_id(7), AddressId::new(7));
    }

    #[test]
    fn test_update_keeps_remote_id() {
        let mut book = AddressBook::new();
        book.push(draft("A").into_remote_address(AddressId::new(4)));
        book.push(draft("B").into_address(AddressId::new(1_700_000)));

        assert!(book.update(AddressId::new(4), draft("A2")));
        assert!(book.update(AddressId::new(1_700_000), draft("B2")));

        let remote_ids: Vec<Option<AddressId>> =
            book.addresses().iter().map(|a| a.remote_id).collect();
        assert_eq!(remote_ids, vec![Some(AddressId::new(4)), None]);
    }

    #[test]
    fn test_stored_address_without_remote_id_is_local() {
        let json = r#"{"id": 3, "full_name": "A", "phone": "9876543210", "address": "x",
            "city": "Pune", "state": "MH", "pincode": "411001"}"#;
        let address: Address = serde_json::from_str(json).expect("deserialize");
        assert_eq!(address.remote_id, None);
    }

    #[test]
    fn test_address_type_parse_and_unknown() {
        assert_eq!("Office".parse::<AddressType>().ok(), Some(AddressType::Work));
        let parsed: AddressType = serde_json::from_str("\"villa\"").expect("deserialize");
        assert_eq!(parsed, AddressType::Other);
    }
}
