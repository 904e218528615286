//! Review Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Collection, Document};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: u8,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// New reviews wait for moderation before they are shown.
    pub fn write(product_id: Uuid, user_id: Uuid, rating: u8, title: Option<String>, comment: Option<String>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::now_v7(), product_id, user_id, rating, title, comment, is_approved: false, created_at: now, updated_at: now }
    }
}

impl Document for Review {
    const COLLECTION: Collection = Collection::Reviews;
    fn id(&self) -> Uuid { self.id }
}
