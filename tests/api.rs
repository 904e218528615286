//! Router tests against the in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use wigvana::api::{self, AppState};
use wigvana::domain::aggregates::{CheckoutSummary, Order, OrderItem, OrderRefs, OrderStatus};
use wigvana::publisher::EventPublisher;
use wigvana::services::Services;
use wigvana::store::{DocumentStore, InMemoryStore, Repository};

struct TestApp {
    router: Router,
    services: Services,
    store: Arc<dyn DocumentStore>,
}

impl TestApp {
    fn new() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let state = AppState::new(Arc::clone(&store), EventPublisher::disabled());
        Self { router: api::router(state.clone(), false), services: state.services, store }
    }

    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send(method, uri, token, &[], body.map(|b| b.to_string())).await
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, headers: &[(&str, &str)], body: Option<String>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(format!("/api/v1{uri}"));
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let request = match body {
            Some(body) => request.header("content-type", "application/json").body(Body::from(body)),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    /// Returns `(user_id, token)`.
    async fn register(&self, email: &str, roles: &[&str]) -> (Uuid, String) {
        let (status, body) = self
            .call(
                "POST",
                "/auth/register",
                None,
                Some(json!({"firstName": "Test", "lastName": "User", "email": email, "password": "password123", "roles": roles})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (body["user"]["id"].as_str().unwrap().parse().unwrap(), body["accessToken"].as_str().unwrap().to_string())
    }

    async fn admin(&self) -> (Uuid, String) {
        let admin = self.services.auth.bootstrap_admin("admin@wigvana.test", "admin-password").await.unwrap().unwrap();
        let (status, body) =
            self.call("POST", "/auth/login", None, Some(json!({"email": "admin@wigvana.test", "password": "admin-password"}))).await;
        assert_eq!(status, StatusCode::OK);
        (admin.id, body["accessToken"].as_str().unwrap().to_string())
    }

    async fn insert_order(&self, user_id: Uuid, status: OrderStatus, subtotal: i64) -> Order {
        let item = OrderItem {
            product_id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            name: "Bob Wig".into(),
            quantity: 1,
            selected_length: "12".into(),
            selected_color: "1B".into(),
            unit_price: Decimal::new(subtotal, 0),
            line_total: Decimal::new(subtotal, 0),
        };
        let refs = OrderRefs { shipping_address_id: Uuid::new_v4(), billing_address_id: Uuid::new_v4(), payment_method_id: Uuid::new_v4() };
        let mut order = Order::place(user_id, refs, "standard", None, vec![item], &CheckoutSummary::for_subtotal(Decimal::new(subtotal, 0)));
        order.status = status;
        Repository::<Order>::new(Arc::clone(&self.store)).insert(&order).await.unwrap();
        order
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.router.clone().oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_token_is_401_with_error_body() {
    let app = TestApp::new();
    let (status, body) = app.call("GET", "/me/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"code": 401, "message": "Please authenticate"}));
}

#[tokio::test]
async fn test_role_guards() {
    let app = TestApp::new();
    let (_, buyer) = app.register("buyer@example.com", &[]).await;
    let (_, seller) = app.register("seller@example.com", &["seller"]).await;

    assert_eq!(app.call("GET", "/admin/stats", Some(&buyer), None).await.0, StatusCode::FORBIDDEN);
    assert_eq!(app.call("GET", "/me/products", Some(&buyer), None).await.0, StatusCode::FORBIDDEN);
    assert_eq!(app.call("GET", "/me/products", Some(&seller), None).await.0, StatusCode::OK);
    assert_eq!(app.call("GET", "/admin/stats", Some(&seller), None).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_role_cannot_be_self_assigned() {
    let app = TestApp::new();
    let (_, token) = app.register("sneaky@example.com", &["admin"]).await;
    let (_, me) = app.call("GET", "/auth/me", Some(&token), None).await;
    assert_eq!(me["roles"], json!(["buyer"]));
    assert_eq!(app.call("GET", "/admin/stats", Some(&token), None).await.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = TestApp::new();
    let (status, body) = app.send("POST", "/auth/login", None, &[], Some("{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_deleting_missing_records_is_404() {
    let app = TestApp::new();
    let (_, buyer) = app.register("buyer@example.com", &[]).await;
    let (_, admin) = app.admin().await;
    let missing = Uuid::new_v4();

    let (status, body) = app.call("DELETE", &format!("/me/addresses/{missing}"), Some(&buyer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Address not found");

    assert_eq!(app.call("DELETE", &format!("/me/payment-methods/{missing}"), Some(&buyer), None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.call("DELETE", &format!("/admin/products/{missing}"), Some(&admin), None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.call("DELETE", &format!("/admin/categories/{missing}"), Some(&admin), None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.call("DELETE", &format!("/admin/reviews/{missing}"), Some(&admin), None).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_status_filter_is_exact() {
    let app = TestApp::new();
    let (buyer_id, buyer) = app.register("buyer@example.com", &[]).await;
    app.insert_order(buyer_id, OrderStatus::Completed, 1000).await;
    app.insert_order(buyer_id, OrderStatus::Delivered, 1000).await;

    let (_, all) = app.call("GET", "/me/orders", Some(&buyer), None).await;
    assert_eq!(all["totalResults"], 2);

    let (_, completed) = app.call("GET", "/me/orders?status=completed", Some(&buyer), None).await;
    assert_eq!(completed["totalResults"], 1);
    assert_eq!(completed["results"][0]["status"], "completed");

    for raw in ["Completed", "complete", "COMPLETED"] {
        let (status, page) = app.call("GET", &format!("/me/orders?status={raw}"), Some(&buyer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalResults"], 0, "{raw} must not match");
    }
}

#[tokio::test]
async fn test_dashboard_revenue_counts_completed_only() {
    let app = TestApp::new();
    let (buyer_id, _) = app.register("buyer@example.com", &[]).await;
    let (_, admin) = app.admin().await;
    // totals: 1000 + 500 + 50 = 1550 and 2000 + 500 + 100 = 2600
    app.insert_order(buyer_id, OrderStatus::Completed, 1000).await;
    app.insert_order(buyer_id, OrderStatus::Completed, 2000).await;
    app.insert_order(buyer_id, OrderStatus::Delivered, 4000).await;
    app.insert_order(buyer_id, OrderStatus::Processing, 8000).await;

    let (status, stats) = app.call("GET", "/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["orders"], 4);
    assert_eq!(stats["users"], 2);
    assert_eq!(stats["revenue"].as_f64(), Some(4150.0));
    assert!(stats["recentUsers"].as_array().unwrap().iter().all(|u| u.get("passwordHash").is_none()));
}

#[tokio::test]
async fn test_suspension() {
    let app = TestApp::new();
    let (buyer_id, buyer) = app.register("buyer@example.com", &[]).await;
    let (admin_id, admin) = app.admin().await;

    let (status, _) = app.call("POST", &format!("/admin/users/{admin_id}/suspend"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, user) = app.call("POST", &format!("/admin/users/{buyer_id}/suspend"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["status"], "suspended");
    assert_eq!(app.call("GET", "/auth/me", Some(&buyer), None).await.0, StatusCode::FORBIDDEN);

    let (status, _) = app.call("POST", &format!("/admin/users/{buyer_id}/suspend"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.call("POST", &format!("/admin/users/{buyer_id}/unsuspend"), Some(&admin), None).await;
    assert_eq!(app.call("GET", "/auth/me", Some(&buyer), None).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_listing_checkout_and_fulfilment() {
    let app = TestApp::new();
    let (_, seller) = app.register("seller@example.com", &["seller"]).await;
    let (_, buyer) = app.register("buyer@example.com", &[]).await;
    let (_, admin) = app.admin().await;

    let (status, product) = app
        .call(
            "POST",
            "/me/products",
            Some(&seller),
            Some(json!({"name": "Body Wave Lace Front", "price": 1000, "availableLengths": ["18", "24"], "availableColors": ["1B"]})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    assert_eq!(product["approvalStatus"], "pending");
    let product_id = product["id"].as_str().unwrap().to_string();

    let (_, listed) = app.call("GET", "/products", None, None).await;
    assert_eq!(listed["totalResults"], 0);
    assert_eq!(app.call("GET", &format!("/products/{product_id}"), None, None).await.0, StatusCode::NOT_FOUND);

    let (status, _) = app.call("POST", &format!("/admin/products/{product_id}/approve"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, listed) = app.call("GET", "/products", None, None).await;
    assert_eq!(listed["totalResults"], 1);

    let checkout = json!({
        "shippingAddress": {
            "addressLine1": "Bole Road 12",
            "city": "Addis Ababa",
            "country": "ET",
            "contactName": "Hanna Tesfaye",
            "contactPhone": "+251911000000"
        },
        "paymentType": "cod",
        "items": [{"productId": product_id, "quantity": 2, "selectedLength": "24", "selectedColor": "1B"}]
    })
    .to_string();
    let key = [("idempotency-key", "checkout-1")];
    let (status, order) = app.send("POST", "/me/checkout", Some(&buyer), &key, Some(checkout.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    // (1000 + 4 * 500) * 2 = 6000, + 500 shipping, + 300 fee
    assert_eq!(order["totalAmount"].as_f64(), Some(6800.0));
    assert_eq!(order["status"], "pending_payment");

    let (_, replay) = app.send("POST", "/me/checkout", Some(&buyer), &key, Some(checkout)).await;
    assert_eq!(replay["id"], order["id"]);
    let (_, mine) = app.call("GET", "/me/orders", Some(&buyer), None).await;
    assert_eq!(mine["totalResults"], 1);
    let (_, addresses) = app.call("GET", "/me/addresses", Some(&buyer), None).await;
    assert_eq!(addresses["totalResults"], 2);

    let order_id = order["id"].as_str().unwrap().to_string();
    let (_, store_orders) = app.call("GET", "/me/store/orders", Some(&seller), None).await;
    assert_eq!(store_orders["totalResults"], 1);

    let (status, updated) =
        app.call("PATCH", &format!("/me/store/orders/{order_id}/status"), Some(&seller), Some(json!({"status": "processing"}))).await;
    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["status"], "processing");

    let (status, cancelled) = app.call("POST", &format!("/orders/{order_id}/cancel"), Some(&buyer), Some(json!({"reason": "changed my mind"}))).await;
    assert_eq!(status, StatusCode::OK, "{cancelled}");
    assert_eq!(cancelled["status"], "cancelled_by_user");
}

#[tokio::test]
async fn test_buyer_cannot_see_other_orders() {
    let app = TestApp::new();
    let (alice_id, _) = app.register("alice@example.com", &[]).await;
    let (_, bob) = app.register("bob@example.com", &[]).await;
    let order = app.insert_order(alice_id, OrderStatus::Processing, 1000).await;

    assert_eq!(app.call("GET", &format!("/me/orders/{}", order.id), Some(&bob), None).await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.call("POST", &format!("/orders/{}/cancel", order.id), Some(&bob), None).await.0, StatusCode::NOT_FOUND);
}
