//! Buyer addresses.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::not_blank;
use crate::domain::aggregates::{Address, AddressType};
use crate::store::{DocumentStore, Filter, Page, PageRequest, Repository, Sort};
use crate::{MarketError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAddressRequest {
    #[validate(custom = "not_blank")]
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[validate(custom = "not_blank")]
    pub city: String,
    #[serde(default)]
    pub state_province_region: String,
    #[serde(default)]
    pub postal_code: String,
    #[validate(custom = "not_blank")]
    pub country: String,
    #[validate(custom = "not_blank")]
    pub contact_name: String,
    #[validate(custom = "not_blank")]
    pub contact_phone: String,
    #[serde(default)]
    pub address_type: AddressType,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAddressesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub address_type: Option<AddressType>,
}

#[derive(Clone)]
pub struct AddressService {
    addresses: Repository<Address>,
}

impl AddressService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { addresses: Repository::new(store) }
    }

    /// Every call stores a new record; identical addresses are not merged.
    pub async fn create(&self, user_id: Uuid, req: CreateAddressRequest) -> Result<Address> {
        req.validate()?;
        let address = Address {
            id: Uuid::now_v7(),
            user_id,
            address_line1: req.address_line1,
            address_line2: req.address_line2,
            city: req.city,
            state_province_region: req.state_province_region,
            postal_code: req.postal_code,
            country: req.country,
            contact_name: req.contact_name,
            contact_phone: req.contact_phone,
            address_type: req.address_type,
            created_at: Utc::now(),
        };
        self.addresses.insert(&address).await?;
        tracing::debug!(user_id = %user_id, address_id = %address.id, "address created");
        Ok(address)
    }

    pub async fn list_mine(&self, user_id: Uuid, query: ListAddressesQuery) -> Result<Page<Address>> {
        let filter = Filter::new().eq("userId", user_id).eq_opt("addressType", query.address_type);
        Ok(self.addresses.page(filter, Sort::newest_first(), PageRequest::new(query.page, query.limit)).await?)
    }

    /// Someone else's address is reported as missing.
    pub async fn get_owned(&self, user_id: Uuid, id: Uuid) -> Result<Address> {
        match self.addresses.get(id).await? {
            Some(address) if address.user_id == user_id => Ok(address),
            _ => Err(MarketError::NotFound("Address")),
        }
    }

    pub async fn delete_mine(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.get_owned(user_id, id).await?;
        self.delete(id).await
    }

    pub(crate) async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.addresses.delete(id).await? {
            return Err(MarketError::NotFound("Address"));
        }
        Ok(())
    }
}
