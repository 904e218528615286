//! Orders: buyer placement, seller fulfilment and admin moderation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{found, resolve_sort};
use crate::domain::aggregates::{
    line_subtotal, Actor, Address, CheckoutSummary, Order, OrderItem, OrderRefs, OrderStatus, PaymentMethod, Product,
};
use crate::domain::events::OrderEvent;
use crate::domain::value_objects::HairLength;
use crate::publisher::EventPublisher;
use crate::store::{DocumentStore, Filter, Page, PageRequest, Repository, Sort, SortDirection};
use crate::{MarketError, Result};

const SORTABLE: &[&str] = &["createdAt", "updatedAt", "totalAmount", "status"];
pub const DEFAULT_SHIPPING_METHOD: &str = "standard";

pub(crate) fn default_shipping_method() -> String {
    DEFAULT_SHIPPING_METHOD.to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: u32,
    #[serde(default)]
    pub selected_length: HairLength,
    #[serde(default)]
    pub selected_color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address_id: Uuid,
    pub billing_address_id: Uuid,
    pub payment_method_id: Uuid,
    #[serde(default = "default_shipping_method")]
    pub shipping_method: String,
    pub notes_by_buyer: Option<String>,
    #[validate(length(min = 1, message = "must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
}

/// Buyer and seller listing parameters. `status` matches the stored value exactly.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    #[serde(rename = "sort_by")]
    pub sort_by: Option<String>,
    pub order: Option<SortDirection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListOrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    #[serde(rename = "sort_by")]
    pub sort_by: Option<String>,
    pub order: Option<SortDirection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Repository<Order>,
    products: Repository<Product>,
    addresses: Repository<Address>,
    payment_methods: Repository<PaymentMethod>,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventPublisher) -> Self {
        Self {
            orders: Repository::new(Arc::clone(&store)),
            products: Repository::new(Arc::clone(&store)),
            addresses: Repository::new(Arc::clone(&store)),
            payment_methods: Repository::new(store),
            events,
        }
    }

    /// Place an order. Prices come from the catalog, never from the request.
    pub async fn create(&self, user_id: Uuid, req: CreateOrderRequest) -> Result<Order> {
        req.validate()?;
        for item in &req.items {
            item.validate()?;
        }
        self.owned_address(user_id, req.shipping_address_id).await?;
        self.owned_address(user_id, req.billing_address_id).await?;
        match self.payment_methods.get(req.payment_method_id).await? {
            Some(method) if method.user_id == user_id => {}
            _ => return Err(MarketError::NotFound("Payment method")),
        }

        let mut items = Vec::with_capacity(req.items.len());
        for line in req.items {
            let product = match self.products.get(line.product_id).await? {
                Some(product) if product.is_listed() => product,
                _ => return Err(MarketError::NotFound("Product")),
            };
            items.push(OrderItem {
                product_id: product.id,
                seller_id: product.seller_id,
                name: product.name,
                quantity: line.quantity,
                line_total: line_subtotal(product.price, &line.selected_length, line.quantity),
                selected_length: line.selected_length,
                selected_color: line.selected_color,
                unit_price: product.price,
            });
        }
        let subtotal = items.iter().map(|i| i.line_total).sum();
        let summary = CheckoutSummary::for_subtotal(subtotal);
        let refs = OrderRefs {
            shipping_address_id: req.shipping_address_id,
            billing_address_id: req.billing_address_id,
            payment_method_id: req.payment_method_id,
        };
        let shipping_method = match req.shipping_method.trim() {
            "" => DEFAULT_SHIPPING_METHOD.to_string(),
            method => method.to_string(),
        };
        let order = Order::place(user_id, refs, shipping_method, req.notes_by_buyer, items, &summary);
        self.orders.insert(&order).await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            total = %order.total_amount,
            items = order.items.len(),
            "order placed"
        );
        self.events
            .publish(OrderEvent::Placed {
                order_id: order.id,
                user_id,
                seller_ids: order.seller_ids.clone(),
                total: order.total_amount,
            })
            .await;
        Ok(order)
    }

    async fn owned_address(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        match self.addresses.get(id).await? {
            Some(address) if address.user_id == user_id => Ok(()),
            _ => Err(MarketError::NotFound("Address")),
        }
    }

    pub async fn list_mine(&self, user_id: Uuid, query: ListOrdersQuery) -> Result<Page<Order>> {
        let filter = Filter::new().eq("userId", user_id).eq_opt("status", query.status.as_deref());
        self.page(filter, query.page, query.limit, query.sort_by.as_deref(), query.order).await
    }

    pub async fn get_mine(&self, user_id: Uuid, id: Uuid) -> Result<Order> {
        match self.orders.get(id).await? {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(MarketError::NotFound("Order")),
        }
    }

    /// Buyers may cancel until the order ships.
    pub async fn cancel(&self, user_id: Uuid, id: Uuid, reason: Option<String>) -> Result<Order> {
        let mut order = self.get_mine(user_id, id).await?;
        order.cancel(Actor::Buyer, reason)?;
        self.save_status(&order, Actor::Buyer).await?;
        Ok(order)
    }

    pub async fn list_for_seller(&self, seller_id: Uuid, query: ListOrdersQuery) -> Result<Page<Order>> {
        let filter = Filter::new().contains("sellerIds", seller_id).eq_opt("status", query.status.as_deref());
        self.page(filter, query.page, query.limit, query.sort_by.as_deref(), query.order).await
    }

    pub async fn seller_update_status(&self, seller_id: Uuid, id: Uuid, req: UpdateOrderStatusRequest) -> Result<Order> {
        let mut order = match self.orders.get(id).await? {
            Some(order) if order.involves_seller(seller_id) => order,
            _ => return Err(MarketError::NotFound("Order")),
        };
        let to = parse_status(&req.status, Actor::Seller)?;
        if to == Actor::Seller.cancellation() {
            order.cancel(Actor::Seller, req.reason)?;
        } else {
            order.transition(to, Actor::Seller)?;
        }
        self.save_status(&order, Actor::Seller).await?;
        Ok(order)
    }

    pub async fn list_all(&self, query: AdminListOrdersQuery) -> Result<Page<Order>> {
        let filter = Filter::new()
            .eq_opt("id", query.order_id)
            .eq_opt("userId", query.user_id)
            .eq_opt("status", query.status.as_deref());
        let filter = match query.seller_id {
            Some(seller_id) => filter.contains("sellerIds", seller_id),
            None => filter,
        };
        self.page(filter, query.page, query.limit, query.sort_by.as_deref(), query.order).await
    }

    pub async fn admin_get(&self, id: Uuid) -> Result<Order> {
        found(self.orders.get(id).await?, "Order")
    }

    pub async fn admin_update_status(&self, id: Uuid, req: UpdateOrderStatusRequest) -> Result<Order> {
        let mut order = self.admin_get(id).await?;
        match parse_status(&req.status, Actor::Admin)? {
            OrderStatus::Refunded => order.refund(req.reason)?,
            to if to == Actor::Admin.cancellation() => order.cancel(Actor::Admin, req.reason)?,
            to => order.transition(to, Actor::Admin)?,
        }
        self.save_status(&order, Actor::Admin).await?;
        Ok(order)
    }

    pub async fn refund(&self, id: Uuid, reason: Option<String>) -> Result<Order> {
        let mut order = self.admin_get(id).await?;
        order.refund(reason)?;
        self.save_status(&order, Actor::Admin).await?;
        Ok(order)
    }

    /// Remove an order outright. Used only to undo a failed checkout.
    pub(crate) async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.orders.delete(id).await? {
            return Err(MarketError::NotFound("Order"));
        }
        Ok(())
    }

    async fn page(
        &self,
        filter: Filter,
        page: Option<u32>,
        limit: Option<u32>,
        sort_by: Option<&str>,
        order: Option<SortDirection>,
    ) -> Result<Page<Order>> {
        let sort: Sort = resolve_sort(sort_by, order, SORTABLE);
        Ok(self.orders.page(filter, sort, PageRequest::new(page, limit)).await?)
    }

    async fn save_status(&self, order: &Order, by: Actor) -> Result<()> {
        if !self.orders.replace(order).await? {
            return Err(MarketError::NotFound("Order"));
        }
        tracing::info!(order_id = %order.id, status = %order.status, by = ?by, "order status changed");
        self.events
            .publish(OrderEvent::StatusChanged { order_id: order.id, status: order.status, by })
            .await;
        Ok(())
    }
}

fn parse_status(raw: &str, actor: Actor) -> Result<OrderStatus> {
    OrderStatus::from_input(raw, actor).ok_or_else(|| MarketError::Validation(format!("Invalid order status: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{AddressType, PaymentType};
    use crate::domain::value_objects::Slug;
    use crate::store::InMemoryStore;
    use chrono::Utc;
    use rust_decimal::Decimal;

    struct Fixture {
        service: OrderService,
        store: Arc<dyn DocumentStore>,
        buyer: Uuid,
        seller: Uuid,
        request: CreateOrderRequest,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();

        let mut product = Product::submit(seller, "Brazilian Body Wave", Slug::from_name("Brazilian Body Wave").unwrap(), Decimal::new(3000, 0));
        product.approve().unwrap();
        product.is_published = true;
        Repository::<Product>::new(Arc::clone(&store)).insert(&product).await.unwrap();

        let address = Address {
            id: Uuid::new_v4(), user_id: buyer, address_line1: "Bole Road 12".into(), address_line2: None,
            city: "Addis Ababa".into(), state_province_region: "Addis Ababa".into(), postal_code: "1000".into(),
            country: "ET".into(), contact_name: "Hanna".into(), contact_phone: "+251911000000".into(),
            address_type: AddressType::Shipping, created_at: Utc::now(),
        };
        Repository::<Address>::new(Arc::clone(&store)).insert(&address).await.unwrap();
        let method = PaymentMethod {
            id: Uuid::new_v4(), user_id: buyer, payment_token: "tok_demo_1".into(), payment_type: PaymentType::Cod,
            billing_address_id: address.id, is_default: true, created_at: Utc::now(),
        };
        Repository::<PaymentMethod>::new(Arc::clone(&store)).insert(&method).await.unwrap();

        let request = CreateOrderRequest {
            shipping_address_id: address.id,
            billing_address_id: address.id,
            payment_method_id: method.id,
            shipping_method: "standard".into(),
            notes_by_buyer: Some("Call before delivery".into()),
            items: vec![OrderItemRequest { product_id: product.id, quantity: 2, selected_length: "22".into(), selected_color: "natural black".into() }],
        };
        let service = OrderService::new(Arc::clone(&store), EventPublisher::disabled());
        Fixture { service, store, buyer, seller, request }
    }

    #[tokio::test]
    async fn test_create_recomputes_totals_from_catalog() {
        let f = fixture().await;
        let order = f.service.create(f.buyer, f.request).await.unwrap();
        // (3000 + 2 * 500) * 2
        assert_eq!(order.subtotal, Decimal::new(8000, 0));
        assert_eq!(order.shipping_fee, Decimal::new(500, 0));
        assert_eq!(order.service_fee, Decimal::new(400, 0));
        assert_eq!(order.total_amount, Decimal::new(8900, 0));
        assert_eq!(order.seller_ids, vec![f.seller]);
        assert_eq!(order.status, OrderStatus::PendingPayment);
    }

    #[tokio::test]
    async fn test_create_requires_owned_references() {
        let f = fixture().await;
        let err = f.service.create(Uuid::new_v4(), f.request).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound("Address")));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_items_and_zero_quantity() {
        let f = fixture().await;
        let mut empty = f.request.clone();
        empty.items.clear();
        assert!(matches!(f.service.create(f.buyer, empty).await, Err(MarketError::Validation(_))));
        let mut zero = f.request;
        zero.items[0].quantity = 0;
        assert!(matches!(f.service.create(f.buyer, zero).await, Err(MarketError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unlisted_product_cannot_be_ordered() {
        let f = fixture().await;
        let products = Repository::<Product>::new(Arc::clone(&f.store));
        let mut product = products.get(f.request.items[0].product_id).await.unwrap().unwrap();
        product.is_published = false;
        products.replace(&product).await.unwrap();
        assert!(matches!(f.service.create(f.buyer, f.request).await, Err(MarketError::NotFound("Product"))));
    }

    #[tokio::test]
    async fn test_status_filter_is_exact() {
        let f = fixture().await;
        f.service.create(f.buyer, f.request.clone()).await.unwrap();
        let exact = ListOrdersQuery { status: Some("pending_payment".into()), ..Default::default() };
        assert_eq!(f.service.list_mine(f.buyer, exact).await.unwrap().total_results, 1);
        let synonym = ListOrdersQuery { status: Some("pending".into()), ..Default::default() };
        assert_eq!(f.service.list_mine(f.buyer, synonym).await.unwrap().total_results, 0);
        let cased = ListOrdersQuery { status: Some("Pending_Payment".into()), ..Default::default() };
        assert_eq!(f.service.list_mine(f.buyer, cased).await.unwrap().total_results, 0);
    }

    #[tokio::test]
    async fn test_seller_fulfilment_and_buyer_cancel_window() {
        let f = fixture().await;
        let order = f.service.create(f.buyer, f.request).await.unwrap();
        let status = |s: &str| UpdateOrderStatusRequest { status: s.into(), reason: None };

        let err = f.service.seller_update_status(Uuid::new_v4(), order.id, status("processing")).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound("Order")));

        f.service.seller_update_status(f.seller, order.id, status("processing")).await.unwrap();
        f.service.seller_update_status(f.seller, order.id, status("shipped")).await.unwrap();
        let err = f.service.cancel(f.buyer, order.id, None).await.unwrap_err();
        assert!(matches!(err, MarketError::InvalidTransition { .. }));

        let seen = f.service.list_for_seller(f.seller, ListOrdersQuery::default()).await.unwrap();
        assert_eq!(seen.results[0].status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_admin_status_accepts_legacy_synonyms() {
        let f = fixture().await;
        let order = f.service.create(f.buyer, f.request).await.unwrap();
        let updated = f
            .service
            .admin_update_status(order.id, UpdateOrderStatusRequest { status: "cancelled".into(), reason: Some("fraud".into()) })
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::CancelledByAdmin);
        assert_eq!(updated.cancellation_reason.as_deref(), Some("fraud"));

        let refunded = f.service.refund(order.id, Some("goodwill".into())).await.unwrap();
        assert_eq!(refunded.status, OrderStatus::Refunded);

        let err = f
            .service
            .admin_update_status(order.id, UpdateOrderStatusRequest { status: "lost".into(), reason: None })
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_order_is_not_found() {
        let f = fixture().await;
        assert!(matches!(f.service.delete(Uuid::new_v4()).await, Err(MarketError::NotFound("Order"))));
    }
}
