//! Domain events
//!
//! Published as JSON on `wigvana.<subject>` after the state change is stored.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{Actor, ApplicationStatus, ApprovalStatus, OrderStatus};

pub const SUBJECT_PREFIX: &str = "wigvana";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    User(UserEvent),
    Seller(SellerEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ProductEvent {
    ApprovalChanged { product_id: Uuid, seller_id: Uuid, status: ApprovalStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, seller_ids: Vec<Uuid>, total: Decimal },
    StatusChanged { order_id: Uuid, status: OrderStatus, by: Actor },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum UserEvent {
    Suspended { user_id: Uuid },
    Unsuspended { user_id: Uuid },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SellerEvent {
    ApplicationReviewed { application_id: Uuid, user_id: Uuid, status: ApplicationStatus },
}

impl DomainEvent {
    /// Subject suffix, without the `wigvana.` prefix.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::ApprovalChanged { .. }) => "product.approval_changed",
            Self::Order(OrderEvent::Placed { .. }) => "order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "order.status_changed",
            Self::User(UserEvent::Suspended { .. }) => "user.suspended",
            Self::User(UserEvent::Unsuspended { .. }) => "user.unsuspended",
            Self::Seller(SellerEvent::ApplicationReviewed { .. }) => "seller.application_reviewed",
        }
    }

    pub fn subject(&self) -> String { format!("{SUBJECT_PREFIX}.{}", self.name()) }
}

impl From<ProductEvent> for DomainEvent { fn from(e: ProductEvent) -> Self { Self::Product(e) } }
impl From<OrderEvent> for DomainEvent { fn from(e: OrderEvent) -> Self { Self::Order(e) } }
impl From<UserEvent> for DomainEvent { fn from(e: UserEvent) -> Self { Self::User(e) } }
impl From<SellerEvent> for DomainEvent { fn from(e: SellerEvent) -> Self { Self::Seller(e) } }
