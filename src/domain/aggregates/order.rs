//! Order Aggregate
//!
//! Status is a closed enumeration. Free-form status strings from clients go
//! through [`OrderStatus::from_input`], which folds the legacy spellings
//! (`pending`, `complete`, bare `cancelled`, ...) into one variant. Stored
//! documents always carry the canonical snake_case name, so filters and the
//! revenue aggregation can compare strings exactly.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::CheckoutSummary;
use super::TransitionError;
use crate::domain::value_objects::{HairLength, CURRENCY};
use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Completed,
    CancelledByUser,
    CancelledBySeller,
    CancelledByAdmin,
    Refunded,
}

/// Who is asking for a status change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor { Buyer, Seller, Admin }

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::CancelledByUser => "cancelled_by_user",
            Self::CancelledBySeller => "cancelled_by_seller",
            Self::CancelledByAdmin => "cancelled_by_admin",
            Self::Refunded => "refunded",
        }
    }

    /// Parse a status sent by a client, accepting legacy synonyms.
    pub fn from_input(raw: &str, actor: Actor) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let status = match normalized.as_str() {
            "pending" | "pending_payment" => Self::PendingPayment,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "out_for_delivery" => Self::OutForDelivery,
            "delivered" => Self::Delivered,
            "completed" | "complete" => Self::Completed,
            "cancelled_by_user" => Self::CancelledByUser,
            "cancelled_by_seller" => Self::CancelledBySeller,
            "cancelled_by_admin" => Self::CancelledByAdmin,
            "cancelled" | "canceled" => actor.cancellation(),
            "refunded" => Self::Refunded,
            _ => return None,
        };
        Some(status)
    }

    pub fn is_cancelled(self) -> bool {
        matches!(self, Self::CancelledByUser | Self::CancelledBySeller | Self::CancelledByAdmin)
    }

    pub fn can_transition_to(self, to: Self) -> bool {
        use OrderStatus::*;
        match self {
            PendingPayment | Processing if to.is_cancelled() => true,
            PendingPayment => to == Processing,
            Processing => to == Shipped,
            Shipped => matches!(to, OutForDelivery | Delivered),
            OutForDelivery => to == Delivered,
            Delivered => matches!(to, Completed | Refunded),
            Completed | CancelledByUser | CancelledBySeller | CancelledByAdmin => to == Refunded,
            Refunded => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

impl Actor {
    pub const fn cancellation(self) -> OrderStatus {
        match self {
            Self::Buyer => OrderStatus::CancelledByUser,
            Self::Seller => OrderStatus::CancelledBySeller,
            Self::Admin => OrderStatus::CancelledByAdmin,
        }
    }

    pub fn may_set(self, status: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            Self::Buyer => status == CancelledByUser,
            Self::Seller => matches!(status, Processing | Shipped | OutForDelivery | Delivered | CancelledBySeller),
            Self::Admin => !matches!(status, CancelledByUser | CancelledBySeller),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub selected_length: HairLength,
    pub selected_color: String,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange { pub status: OrderStatus, pub by: Actor, pub at: DateTime<Utc> }

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub seller_ids: Vec<Uuid>,
    pub shipping_address_id: Uuid,
    pub billing_address_id: Uuid,
    pub payment_method_id: Uuid,
    pub shipping_method: String,
    pub notes_by_buyer: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub service_fee: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub status: OrderStatus,
    pub status_history: Vec<StatusChange>,
    pub cancellation_reason: Option<String>,
    pub refund_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// References captured during checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderRefs { pub shipping_address_id: Uuid, pub billing_address_id: Uuid, pub payment_method_id: Uuid }

impl Order {
    pub fn place(user_id: Uuid, refs: OrderRefs, shipping_method: impl Into<String>, notes: Option<String>, items: Vec<OrderItem>, summary: &CheckoutSummary) -> Self {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut seller_ids: Vec<Uuid> = items.iter().map(|i| i.seller_id).collect();
        seller_ids.sort_unstable();
        seller_ids.dedup();
        Self {
            order_number: order_number(id),
            id, user_id, seller_ids,
            shipping_address_id: refs.shipping_address_id, billing_address_id: refs.billing_address_id,
            payment_method_id: refs.payment_method_id, shipping_method: shipping_method.into(),
            notes_by_buyer: notes, items,
            subtotal: summary.subtotal.amount(), shipping_fee: summary.shipping.amount(),
            service_fee: summary.service_fee.amount(), total_amount: summary.total.amount(),
            currency: CURRENCY.to_string(), status: OrderStatus::PendingPayment,
            status_history: vec![StatusChange { status: OrderStatus::PendingPayment, by: Actor::Buyer, at: now }],
            cancellation_reason: None, refund_reason: None, created_at: now, updated_at: now,
        }
    }

    pub fn involves_seller(&self, seller_id: Uuid) -> bool { self.seller_ids.contains(&seller_id) }

    pub fn transition(&mut self, to: OrderStatus, by: Actor) -> Result<(), TransitionError> {
        if !by.may_set(to) || !self.status.can_transition_to(to) {
            return Err(TransitionError::new("order status", self.status, to));
        }
        let now = Utc::now();
        self.status = to;
        self.status_history.push(StatusChange { status: to, by, at: now });
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self, by: Actor, reason: Option<String>) -> Result<(), TransitionError> {
        self.transition(by.cancellation(), by)?;
        self.cancellation_reason = reason;
        Ok(())
    }

    pub fn refund(&mut self, reason: Option<String>) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Refunded, Actor::Admin)?;
        self.refund_reason = reason;
        Ok(())
    }
}

/// Short human-facing reference built from the random tail of the id.
fn order_number(id: Uuid) -> String {
    let hex = id.simple().to_string().to_uppercase();
    format!("WV-{}", &hex[hex.len() - 10..])
}

impl Document for Order {
    const COLLECTION: Collection = Collection::Orders;
    fn id(&self) -> Uuid { self.id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::CheckoutSummary;

    fn order() -> Order {
        let refs = OrderRefs { shipping_address_id: Uuid::new_v4(), billing_address_id: Uuid::new_v4(), payment_method_id: Uuid::new_v4() };
        let item = OrderItem {
            product_id: Uuid::new_v4(), seller_id: Uuid::new_v4(), name: "Curly Bob".into(), quantity: 2,
            selected_length: "16".into(), selected_color: "black".into(), unit_price: Decimal::new(890, 0), line_total: Decimal::new(1780, 0),
        };
        let summary = CheckoutSummary::for_subtotal(Decimal::new(1780, 0));
        Order::place(Uuid::new_v4(), refs, "standard", None, vec![item], &summary)
    }

    #[test]
    fn test_order_workflow() {
        let mut o = order();
        assert_eq!(o.status, OrderStatus::PendingPayment);
        assert_eq!(o.total_amount, Decimal::new(1780 + 500 + 89, 0));
        o.transition(OrderStatus::Processing, Actor::Seller).unwrap();
        o.transition(OrderStatus::Shipped, Actor::Seller).unwrap();
        o.transition(OrderStatus::Delivered, Actor::Seller).unwrap();
        o.transition(OrderStatus::Completed, Actor::Admin).unwrap();
        assert_eq!(o.status_history.len(), 5);
    }

    #[test]
    fn test_buyer_cannot_cancel_shipped_order() {
        let mut o = order();
        o.transition(OrderStatus::Processing, Actor::Seller).unwrap();
        o.transition(OrderStatus::Shipped, Actor::Seller).unwrap();
        assert!(o.cancel(Actor::Buyer, None).is_err());
        assert_eq!(o.status, OrderStatus::Shipped);
    }

    #[test]
    fn test_buyer_cancel_sets_user_variant() {
        let mut o = order();
        o.cancel(Actor::Buyer, Some("changed my mind".into())).unwrap();
        assert_eq!(o.status, OrderStatus::CancelledByUser);
        assert!(o.transition(OrderStatus::Processing, Actor::Admin).is_err());
    }

    #[test]
    fn test_seller_cannot_complete() {
        let mut o = order();
        assert!(o.transition(OrderStatus::Completed, Actor::Seller).is_err());
    }

    #[test]
    fn test_legacy_status_input() {
        assert_eq!(OrderStatus::from_input("pending", Actor::Admin), Some(OrderStatus::PendingPayment));
        assert_eq!(OrderStatus::from_input("Complete", Actor::Admin), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::from_input("out-for-delivery", Actor::Seller), Some(OrderStatus::OutForDelivery));
        assert_eq!(OrderStatus::from_input("cancelled", Actor::Seller), Some(OrderStatus::CancelledBySeller));
        assert_eq!(OrderStatus::from_input("delivered", Actor::Admin), Some(OrderStatus::Delivered));
        assert_eq!(OrderStatus::from_input("lost", Actor::Admin), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(OrderStatus::CancelledByUser).unwrap(), "cancelled_by_user");
        assert_eq!(OrderStatus::PendingPayment.to_string(), "pending_payment");
    }
}
