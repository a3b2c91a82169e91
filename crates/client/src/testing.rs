//! In-memory remote used by the synchronizer tests.
#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::SecretString;

use cartsync_core::{
    Address, AddressBook, AddressDraft, AddressId, CartLineItem, CatalogId, CategoryId, ProductId,
    RemoteLineId,
};

use crate::api::ApiError;
use crate::remote::{AddressResource, CartResource, NewCartLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCall {
    ListLines,
    CreateLine,
    UpdateLine,
    DeleteLine,
    ListAddresses,
    CreateAddress,
    UpdateAddress,
    DeleteAddress,
    SetDefaultAddress,
}

#[derive(Default)]
struct State {
    lines: Vec<CartLineItem>,
    addresses: AddressBook,
    created_lines: Vec<NewCartLine>,
    calls: Vec<RemoteCall>,
    next_id: i64,
    fail: bool,
    fail_lists: bool,
    omit_created_record: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
}

fn failure() -> ApiError {
    ApiError::Api {
        status: 503,
        message: "unavailable".to_string(),
    }
}

fn not_found() -> ApiError {
    ApiError::Api {
        status: 404,
        message: "not found".to_string(),
    }
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail.
    pub fn fail_all(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    /// Make only the list calls fail, so mutations succeed but re-fetches do not.
    pub fn fail_lists(&self, fail: bool) {
        self.state.lock().unwrap().fail_lists = fail;
    }

    /// Make create calls succeed without returning the record.
    pub fn omit_created_record(&self, omit: bool) {
        self.state.lock().unwrap().omit_created_record = omit;
    }

    pub fn seed_line(&self, catalog_id: CatalogId, quantity: u32, unit_price: Decimal) {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.lines.push(CartLineItem {
            catalog_id,
            display_name: format!("Product {catalog_id}"),
            unit_price,
            quantity,
            image_ref: None,
            unit_label: Some("kg".to_string()),
            category_id: Some(CategoryId::new(1)),
            product_id: Some(ProductId::new(catalog_id.as_i64())),
            remote_line_id: Some(RemoteLineId::new(id)),
            delivery_charge: None,
            delivery_date: None,
        });
    }

    pub fn seed_address(&self, draft: AddressDraft) -> AddressId {
        let mut state = self.state.lock().unwrap();
        let id = AddressId::new(state.next_id());
        state.addresses.push(draft.into_remote_address(id));
        id
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created_lines(&self) -> Vec<NewCartLine> {
        self.state.lock().unwrap().created_lines.clone()
    }

    pub fn remote_lines(&self) -> Vec<CartLineItem> {
        self.state.lock().unwrap().lines.clone()
    }

    pub fn remote_addresses(&self) -> Vec<Address> {
        self.state.lock().unwrap().addresses.addresses().to_vec()
    }

    fn record(&self, call: RemoteCall) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.fail {
            return Err(failure());
        }
        Ok(state)
    }

    fn record_list(&self, call: RemoteCall) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
        let state = self.record(call)?;
        if state.fail_lists {
            return Err(failure());
        }
        Ok(state)
    }
}

#[async_trait]
impl CartResource for FakeRemote {
    async fn list_lines(&self, _token: &SecretString) -> Result<Vec<CartLineItem>, ApiError> {
        Ok(self.record_list(RemoteCall::ListLines)?.lines.clone())
    }

    async fn create_line(
        &self,
        _token: &SecretString,
        line: &NewCartLine,
    ) -> Result<bool, ApiError> {
        let mut state = self.record(RemoteCall::CreateLine)?;
        state.created_lines.push(line.clone());

        let catalog_id = CatalogId::new(line.product_id.as_i64());
        if let Some(existing) = state.lines.iter_mut().find(|l| l.catalog_id == catalog_id) {
            existing.quantity += line.quantity;
        } else {
            let id = state.next_id();
            state.lines.push(CartLineItem {
                catalog_id,
                display_name: format!("Product {catalog_id}"),
                unit_price: line.price,
                quantity: line.quantity,
                image_ref: None,
                unit_label: Some(line.unit_label.clone()),
                category_id: Some(line.category_id),
                product_id: Some(line.product_id),
                remote_line_id: Some(RemoteLineId::new(id)),
                delivery_charge: Some(line.delivery_charge),
                delivery_date: Some(line.delivery_date),
            });
        }
        Ok(!state.omit_created_record)
    }

    async fn update_line(
        &self,
        _token: &SecretString,
        id: RemoteLineId,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let mut state = self.record(RemoteCall::UpdateLine)?;
        let line = state
            .lines
            .iter_mut()
            .find(|l| l.remote_line_id == Some(id))
            .ok_or_else(not_found)?;
        line.quantity = quantity;
        Ok(())
    }

    async fn delete_line(&self, _token: &SecretString, id: RemoteLineId) -> Result<(), ApiError> {
        let mut state = self.record(RemoteCall::DeleteLine)?;
        let before = state.lines.len();
        state.lines.retain(|l| l.remote_line_id != Some(id));
        if state.lines.len() == before {
            return Err(not_found());
        }
        Ok(())
    }
}

#[async_trait]
impl AddressResource for FakeRemote {
    async fn list_addresses(&self, _token: &SecretString) -> Result<Vec<Address>, ApiError> {
        Ok(self
            .record_list(RemoteCall::ListAddresses)?
            .addresses
            .addresses()
            .to_vec())
    }

    async fn create_address(
        &self,
        _token: &SecretString,
        draft: &AddressDraft,
    ) -> Result<bool, ApiError> {
        let mut state = self.record(RemoteCall::CreateAddress)?;
        let id = AddressId::new(state.next_id() + 1000);
        state.addresses.push(draft.clone().into_remote_address(id));
        Ok(!state.omit_created_record)
    }

    async fn update_address(
        &self,
        _token: &SecretString,
        id: AddressId,
        draft: &AddressDraft,
    ) -> Result<(), ApiError> {
        let mut state = self.record(RemoteCall::UpdateAddress)?;
        if state.addresses.update(id, draft.clone()) {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    async fn delete_address(&self, _token: &SecretString, id: AddressId) -> Result<(), ApiError> {
        let mut state = self.record(RemoteCall::DeleteAddress)?;
        state.addresses.remove(id).map(|_| ()).ok_or_else(not_found)
    }

    async fn set_default_address(
        &self,
        _token: &SecretString,
        id: AddressId,
    ) -> Result<(), ApiError> {
        let mut state = self.record(RemoteCall::SetDefaultAddress)?;
        if state.addresses.set_default(id) {
            Ok(())
        } else {
            Err(not_found())
        }
    }
}
