//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Slug;
use crate::store::{Collection, Document};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: Slug,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: impl Into<String>, slug: Slug) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: name.into(), slug, description: None, parent_id: None,
            image_url: None, is_active: true, display_order: 0, created_at: now, updated_at: now,
        }
    }
}

impl Document for Category {
    const COLLECTION: Collection = Collection::Categories;
    fn id(&self) -> Uuid { self.id }
}
