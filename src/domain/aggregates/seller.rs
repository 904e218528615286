//! Seller Application Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TransitionError;
use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus { #[default] Pending, Approved, Rejected }

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self { Self::Pending => "pending", Self::Approved => "approved", Self::Rejected => "rejected" })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerApplication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_name: String,
    pub description: Option<String>,
    pub status: ApplicationStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SellerApplication {
    pub fn submit(user_id: Uuid, store_name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), user_id, store_name: store_name.into(), description,
            status: ApplicationStatus::Pending, rejection_reason: None, reviewed_by: None,
            reviewed_at: None, created_at: now, updated_at: now,
        }
    }

    /// Only pending applications can be decided.
    pub fn approve(&mut self, admin_id: Uuid) -> Result<(), TransitionError> {
        self.decide(admin_id, ApplicationStatus::Approved, None)
    }

    pub fn reject(&mut self, admin_id: Uuid, reason: Option<String>) -> Result<(), TransitionError> {
        self.decide(admin_id, ApplicationStatus::Rejected, reason)
    }

    fn decide(&mut self, admin_id: Uuid, to: ApplicationStatus, reason: Option<String>) -> Result<(), TransitionError> {
        if self.status != ApplicationStatus::Pending {
            return Err(TransitionError::new("seller application", self.status, to));
        }
        let now = Utc::now();
        self.status = to;
        self.rejection_reason = reason;
        self.reviewed_by = Some(admin_id);
        self.reviewed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

impl Document for SellerApplication {
    const COLLECTION: Collection = Collection::SellerApplications;
    fn id(&self) -> Uuid { self.id }
}
