//! Single-call checkout.
//!
//! Creates the shipping address, the billing address, the payment method and
//! the order in one request. When a step fails, the records created by the
//! earlier steps are deleted again in reverse order. An optional
//! idempotency key makes a retried request return the order placed by the
//! first one.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::addresses::{AddressService, CreateAddressRequest};
use super::orders::{default_shipping_method, CreateOrderRequest, OrderItemRequest, OrderService};
use super::payment_methods::{CreatePaymentMethodRequest, PaymentMethodService};
use crate::domain::aggregates::{AddressType, Order, PaymentType};
use crate::store::{Collection, Document, DocumentStore, Filter, Repository, StoreError};
use crate::{MarketError, Result};

const IN_FLIGHT: &str = "A checkout with this idempotency key is already in progress";
/// Age after which an unfinished claim counts as abandoned and may be taken over.
const CLAIM_TTL_SECS: i64 = 300;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: CreateAddressRequest,
    /// Defaults to a copy of the shipping address.
    pub billing_address: Option<CreateAddressRequest>,
    #[serde(default)]
    pub payment_type: PaymentType,
    #[serde(default = "default_shipping_method")]
    pub shipping_method: String,
    pub notes_by_buyer: Option<String>,
    #[validate(length(min = 1, message = "must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
}

impl CheckoutRequest {
    fn check(&self) -> Result<()> {
        self.validate()?;
        self.shipping_address.validate()?;
        if let Some(billing) = &self.billing_address {
            billing.validate()?;
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

/// Claim on an idempotency key. `order_id` is set once the order exists.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutKey {
    id: Uuid,
    scoped_key: String,
    user_id: Uuid,
    order_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl Document for CheckoutKey {
    const COLLECTION: Collection = Collection::CheckoutKeys;
    fn id(&self) -> Uuid { self.id }
}

enum Claim {
    Fresh(CheckoutKey),
    Replay(Uuid),
}

/// Records to remove if a later step fails.
enum Created {
    Address(Uuid),
    PaymentMethod(Uuid),
}

#[derive(Clone)]
pub struct CheckoutService {
    keys: Repository<CheckoutKey>,
    addresses: AddressService,
    payment_methods: PaymentMethodService,
    orders: OrderService,
}

impl CheckoutService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        addresses: AddressService,
        payment_methods: PaymentMethodService,
        orders: OrderService,
    ) -> Self {
        Self { keys: Repository::new(store), addresses, payment_methods, orders }
    }

    pub async fn checkout(&self, user_id: Uuid, idempotency_key: Option<&str>, req: CheckoutRequest) -> Result<Order> {
        req.check()?;
        let claim = match idempotency_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => match self.claim(user_id, key).await? {
                Claim::Replay(order_id) => {
                    tracing::info!(user_id = %user_id, order_id = %order_id, "checkout replayed");
                    return self.orders.get_mine(user_id, order_id).await;
                }
                Claim::Fresh(claim) => Some(claim),
            },
            None => None,
        };

        let mut created = Vec::new();
        match self.place(user_id, req, &mut created).await {
            Ok(order) => {
                // The order is placed; nothing below may turn it into an error.
                if let Err(e) = self.payment_methods.promote_default(user_id, order.payment_method_id).await {
                    tracing::warn!(user_id = %user_id, order_id = %order.id, error = %e, "failed to mark checkout payment method as default");
                }
                if let Some(mut claim) = claim {
                    claim.order_id = Some(order.id);
                    if let Err(e) = self.keys.replace(&claim).await {
                        tracing::error!(user_id = %user_id, order_id = %order.id, error = %e, "failed to record order on checkout key");
                    }
                }
                Ok(order)
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, steps = created.len(), "checkout failed, rolling back");
                self.compensate(created).await;
                if let Some(claim) = claim {
                    if let Err(release) = self.keys.delete(claim.id).await {
                        tracing::error!(user_id = %user_id, error = %release, "failed to release checkout key");
                    }
                }
                Err(e)
            }
        }
    }

    async fn claim(&self, user_id: Uuid, key: &str) -> Result<Claim> {
        let claim = CheckoutKey {
            id: Uuid::now_v7(),
            scoped_key: format!("{user_id}:{key}"),
            user_id,
            order_id: None,
            created_at: Utc::now(),
        };
        match self.keys.insert(&claim).await {
            Ok(()) => Ok(Claim::Fresh(claim)),
            Err(StoreError::Conflict { .. }) => {
                let existing = self.keys.find_one(Filter::new().eq("scopedKey", &claim.scoped_key)).await?;
                match existing {
                    Some(CheckoutKey { order_id: Some(order_id), .. }) => Ok(Claim::Replay(order_id)),
                    Some(mut stale) if Utc::now() - stale.created_at > Duration::seconds(CLAIM_TTL_SECS) => {
                        tracing::warn!(user_id = %user_id, claimed_at = %stale.created_at, "taking over abandoned checkout key");
                        stale.created_at = Utc::now();
                        self.keys.replace(&stale).await?;
                        Ok(Claim::Fresh(stale))
                    }
                    _ => Err(MarketError::Conflict(IN_FLIGHT.to_string())),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn place(&self, user_id: Uuid, req: CheckoutRequest, created: &mut Vec<Created>) -> Result<Order> {
        let billing_input = req.billing_address.clone().unwrap_or_else(|| req.shipping_address.clone());

        let shipping = self
            .addresses
            .create(user_id, CreateAddressRequest { address_type: AddressType::Shipping, ..req.shipping_address })
            .await?;
        created.push(Created::Address(shipping.id));

        let billing = self
            .addresses
            .create(user_id, CreateAddressRequest { address_type: AddressType::Billing, ..billing_input })
            .await?;
        created.push(Created::Address(billing.id));

        let method = self
            .payment_methods
            .create(user_id, CreatePaymentMethodRequest {
                payment_token: format!("tok_{}", Uuid::new_v4().simple()),
                payment_type: req.payment_type,
                billing_address_id: billing.id,
                // Promoted once the order exists so a rollback never touches other methods.
                is_default: false,
            })
            .await?;
        created.push(Created::PaymentMethod(method.id));

        self.orders
            .create(user_id, CreateOrderRequest {
                shipping_address_id: shipping.id,
                billing_address_id: billing.id,
                payment_method_id: method.id,
                shipping_method: req.shipping_method,
                notes_by_buyer: req.notes_by_buyer,
                items: req.items,
            })
            .await
    }

    async fn compensate(&self, created: Vec<Created>) {
        for step in created.into_iter().rev() {
            let (kind, id, result) = match step {
                Created::PaymentMethod(id) => ("payment method", id, self.payment_methods.delete(id).await),
                Created::Address(id) => ("address", id, self.addresses.delete(id).await),
            };
            if let Err(e) = result {
                tracing::error!(kind, id = %id, error = %e, "checkout rollback step failed");
            }
        }
    }
}
