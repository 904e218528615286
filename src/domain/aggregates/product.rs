//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TransitionError;
use crate::domain::value_objects::Slug;
use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus { #[default] Pending, Approved, Rejected }

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self { Self::Pending => "pending", Self::Approved => "approved", Self::Rejected => "rejected" })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Decimal,
    pub stock_quantity: u32,
    pub available_lengths: Vec<String>,
    pub available_colors: Vec<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub is_published: bool,
    pub is_featured: bool,
    pub average_rating: f64,
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// A seller submission: pending and unpublished until an admin approves it.
    pub fn submit(seller_id: Uuid, name: impl Into<String>, slug: Slug, price: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), seller_id, category_id: None, name: name.into(), slug,
            description: String::new(), price, stock_quantity: 0, available_lengths: vec![],
            available_colors: vec![], features: vec![], images: vec![],
            approval_status: ApprovalStatus::Pending, rejection_reason: None, is_published: false,
            is_featured: false, average_rating: 0.0, review_count: 0, created_at: now, updated_at: now,
        }
    }

    /// Visible in the public catalog.
    pub fn is_listed(&self) -> bool { self.approval_status == ApprovalStatus::Approved && self.is_published }

    pub fn set_approval(&mut self, to: ApprovalStatus, reason: Option<String>) -> Result<(), TransitionError> {
        match to {
            ApprovalStatus::Approved => self.approve(),
            ApprovalStatus::Rejected => self.reject(reason),
            ApprovalStatus::Pending => { self.reset_approval(); Ok(()) }
        }
    }

    pub fn approve(&mut self) -> Result<(), TransitionError> {
        self.decide(ApprovalStatus::Approved)?;
        self.rejection_reason = None;
        self.is_published = true;
        Ok(())
    }

    pub fn reject(&mut self, reason: Option<String>) -> Result<(), TransitionError> {
        self.decide(ApprovalStatus::Rejected)?;
        self.rejection_reason = reason;
        Ok(())
    }

    /// Send back to moderation from any state.
    pub fn reset_approval(&mut self) {
        self.approval_status = ApprovalStatus::Pending;
        self.rejection_reason = None;
        self.touch();
    }

    fn decide(&mut self, to: ApprovalStatus) -> Result<(), TransitionError> {
        if self.approval_status != ApprovalStatus::Pending {
            return Err(TransitionError::new("product approval", self.approval_status, to));
        }
        self.approval_status = to;
        self.touch();
        Ok(())
    }

    pub fn set_featured(&mut self, featured: bool) { self.is_featured = featured; self.touch(); }

    pub fn record_rating(&mut self, ratings: &[u8]) {
        self.review_count = u32::try_from(ratings.len()).unwrap_or(u32::MAX);
        self.average_rating = if ratings.is_empty() { 0.0 } else {
            f64::from(ratings.iter().map(|r| u32::from(*r)).sum::<u32>()) / ratings.len() as f64
        };
        self.touch();
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

impl Document for Product {
    const COLLECTION: Collection = Collection::Products;
    fn id(&self) -> Uuid { self.id }
}
