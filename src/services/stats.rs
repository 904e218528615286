//! Admin dashboard counters.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{ApprovalStatus, Order, OrderStatus, Product, User, UserProfile};
use crate::store::{DocumentStore, Filter, FindOptions, Repository, Sort};
use crate::Result;

const RECENT_LIMIT: u64 = 5;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingProduct {
    #[serde(flatten)]
    pub product: Product,
    pub seller: Option<SellerSummary>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub users: u64,
    pub products: u64,
    pub orders: u64,
    pub revenue: Decimal,
    pub recent_users: Vec<UserProfile>,
    pub pending_products: Vec<PendingProduct>,
}

#[derive(Clone)]
pub struct StatsService {
    users: Repository<User>,
    products: Repository<Product>,
    orders: Repository<Order>,
}

impl StatsService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            users: Repository::new(Arc::clone(&store)),
            products: Repository::new(Arc::clone(&store)),
            orders: Repository::new(store),
        }
    }

    /// All queries run concurrently; the figures are not a consistent snapshot.
    ///
    /// Revenue counts `completed` orders only. Delivered orders may still be
    /// refunded, so they are left out.
    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let everything = Filter::new();
        let completed = Filter::new().eq("status", OrderStatus::Completed.as_str());
        let recent_users = FindOptions::default().sorted(Sort::newest_first()).limit(RECENT_LIMIT);
        let pending_products = FindOptions::filtered(Filter::new().eq("approvalStatus", ApprovalStatus::Pending))
            .sorted(Sort::newest_first())
            .limit(RECENT_LIMIT);

        let (users, products, orders, revenue, recent_users, pending_products) = tokio::try_join!(
            self.users.count(&everything),
            self.products.count(&everything),
            self.orders.count(&everything),
            self.orders.sum("totalAmount", &completed),
            self.users.find(&recent_users),
            self.products.find(&pending_products),
        )?;

        let pending_products = self.with_sellers(pending_products).await?;
        Ok(DashboardStats {
            users,
            products,
            orders,
            revenue,
            recent_users: recent_users.iter().map(User::profile).collect(),
            pending_products,
        })
    }

    async fn with_sellers(&self, products: Vec<Product>) -> Result<Vec<PendingProduct>> {
        let mut sellers: HashMap<Uuid, Option<SellerSummary>> = HashMap::new();
        for product in &products {
            if sellers.contains_key(&product.seller_id) {
                continue;
            }
            let summary = self.users.get(product.seller_id).await?.map(|u| SellerSummary {
                id: u.id,
                first_name: u.first_name,
                last_name: u.last_name,
            });
            sellers.insert(product.seller_id, summary);
        }
        Ok(products
            .into_iter()
            .map(|product| PendingProduct {
                seller: sellers.get(&product.seller_id).cloned().flatten(),
                product,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Actor, CheckoutSummary, OrderRefs};
    use crate::domain::value_objects::Slug;
    use crate::store::InMemoryStore;

    async fn order_with_status(orders: &Repository<Order>, total: i64, path: &[OrderStatus]) {
        let refs = OrderRefs { shipping_address_id: Uuid::new_v4(), billing_address_id: Uuid::new_v4(), payment_method_id: Uuid::new_v4() };
        let mut order = Order::place(Uuid::new_v4(), refs, "standard", None, vec![], &CheckoutSummary::for_subtotal(Decimal::ZERO));
        order.total_amount = Decimal::new(total, 0);
        for status in path {
            order.transition(*status, Actor::Admin).unwrap();
        }
        orders.insert(&order).await.unwrap();
    }

    #[tokio::test]
    async fn test_revenue_counts_completed_only() {
        use OrderStatus::*;
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let orders = Repository::<Order>::new(Arc::clone(&store));
        order_with_status(&orders, 1000, &[Processing, Shipped, Delivered, Completed]).await;
        order_with_status(&orders, 2500, &[Processing, Shipped, Delivered, Completed]).await;
        order_with_status(&orders, 9000, &[Processing, Shipped, Delivered]).await;
        order_with_status(&orders, 700, &[]).await;

        let stats = StatsService::new(store).dashboard().await.unwrap();
        assert_eq!(stats.orders, 4);
        assert_eq!(stats.revenue, Decimal::new(3500, 0));
    }

    #[tokio::test]
    async fn test_recent_users_and_pending_products() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let users = Repository::<User>::new(Arc::clone(&store));
        let products = Repository::<Product>::new(Arc::clone(&store));
        let seller = User::register("Meron", "Tadesse", "meron@example.com", "secret-hash".into(), vec![]);
        users.insert(&seller).await.unwrap();
        for i in 0..6 {
            let user = User::register("Buyer", format!("{i}"), &format!("buyer{i}@example.com"), "h".into(), vec![]);
            users.insert(&user).await.unwrap();
        }
        let pending = Product::submit(seller.id, "Afro Kinky", Slug::from_name("Afro Kinky").unwrap(), Decimal::new(1500, 0));
        products.insert(&pending).await.unwrap();
        let mut approved = Product::submit(seller.id, "Silky Straight", Slug::from_name("Silky Straight").unwrap(), Decimal::new(1700, 0));
        approved.approve().unwrap();
        products.insert(&approved).await.unwrap();

        let stats = StatsService::new(store).dashboard().await.unwrap();
        assert_eq!(stats.users, 7);
        assert_eq!(stats.recent_users.len(), 5);
        assert_eq!(stats.pending_products.len(), 1);
        let seller_summary = stats.pending_products[0].seller.as_ref().unwrap();
        assert_eq!(seller_summary.first_name, "Meron");

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["recentUsers"][0].get("passwordHash").is_none());
        assert_eq!(json["pendingProducts"][0]["name"], "Afro Kinky");
    }
}
