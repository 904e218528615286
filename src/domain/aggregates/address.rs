//! Address Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType { #[default] Shipping, Billing }

/// Postal address owned by a user. Never edited after an order references it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state_province_region: String,
    pub postal_code: String,
    pub country: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub address_type: AddressType,
    pub created_at: DateTime<Utc>,
}

impl Document for Address {
    const COLLECTION: Collection = Collection::Addresses;
    fn id(&self) -> Uuid { self.id }
}
