//! Payment Method Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType { #[default] Cod, MobileMoney }

/// Stored payment instrument. `payment_token` is opaque; no gateway is involved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_token: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub billing_address_id: Uuid,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Document for PaymentMethod {
    const COLLECTION: Collection = Collection::PaymentMethods;
    fn id(&self) -> Uuid { self.id }
}
