//! HTTP client and client-side checkout against a mock server.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wigvana::checkout::{CheckoutError, CheckoutStep, CheckoutWorkflow, ShippingForm};
use wigvana::client::{ApiClient, CartStore, ClientError, MarketplaceApi, MemoryStorage, SessionStore};
use wigvana::domain::aggregates::{Address, AddressType, CartLine};
use wigvana::services::addresses::CreateAddressRequest;
use wigvana::services::orders::ListOrdersQuery;

fn session_json(user_id: Uuid, token: &str) -> Value {
    json!({
        "user": {
            "id": user_id,
            "firstName": "Sara",
            "lastName": "Mulugeta",
            "email": "sara@example.com",
            "roles": ["buyer"],
            "status": "active",
            "storeName": null,
            "phone": null,
            "createdAt": "2025-03-01T10:00:00Z"
        },
        "accessToken": token
    })
}

fn empty_page() -> Value {
    json!({"results": [], "page": 1, "limit": 10, "totalPages": 0, "totalResults": 0})
}

fn address_json(address_type: AddressType) -> Value {
    serde_json::to_value(Address {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        address_line1: "Bole Road 12".into(),
        address_line2: None,
        city: "Addis Ababa".into(),
        state_province_region: "Addis Ababa".into(),
        postal_code: "1000".into(),
        country: "ET".into(),
        contact_name: "Sara Mulugeta".into(),
        contact_phone: "+251911000000".into(),
        address_type,
        created_at: Utc::now(),
    })
    .unwrap()
}

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), SessionStore::new(Arc::new(MemoryStorage::new())))
}

#[tokio::test]
async fn test_login_persists_session_and_attaches_token() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_partial_json(json!({"email": "sara@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json(user_id, "tok-1")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me/orders"))
        .and(header("authorization", "Bearer tok-1"))
        .and(query_param("status", "completed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let session = api.login("sara@example.com", "password123").await.unwrap();
    assert_eq!(session.user.id, user_id);
    assert_eq!(api.current_user().map(|u| u.id), Some(user_id));

    let query = ListOrdersQuery { status: Some("completed".into()), ..ListOrdersQuery::default() };
    let page = api.list_my_orders(&query).await.unwrap();
    assert_eq!(page.total_results, 0);
}

#[tokio::test]
async fn test_anonymous_requests_carry_no_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/categories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .mount(&server)
        .await;

    client(&server).list_categories().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_server_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/me/addresses"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"code": 400, "message": "city must not be blank"})))
        .mount(&server)
        .await;

    let req = CreateAddressRequest {
        address_line1: "Bole Road 12".into(),
        address_line2: None,
        city: String::new(),
        state_province_region: String::new(),
        postal_code: String::new(),
        country: "ET".into(),
        contact_name: "Sara".into(),
        contact_phone: "+251911000000".into(),
        address_type: AddressType::Shipping,
    };
    let err = client(&server).create_address(&req).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.server_message(), Some("city must not be blank"));
}

#[tokio::test]
async fn test_error_without_body_has_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/categories"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server).list_categories().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 502, .. }));
}

#[tokio::test]
async fn test_logout_clears_session_even_if_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json(Uuid::new_v4(), "tok-2")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"code": 500, "message": "Internal server error"})))
        .mount(&server)
        .await;

    let api = client(&server);
    api.login("sara@example.com", "password123").await.unwrap();
    api.logout().await.unwrap();
    assert!(api.session().current().unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_with_revoked_token_signs_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json(Uuid::new_v4(), "tok-3")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"code": 401, "message": "Please authenticate"})))
        .mount(&server)
        .await;

    let api = client(&server);
    api.login("sara@example.com", "password123").await.unwrap();
    assert_eq!(api.refresh().await.unwrap(), None);
    assert!(api.current_user().is_none());
}

#[tokio::test]
async fn test_checkout_stops_at_failed_payment_method() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/me/addresses"))
        .and(body_partial_json(json!({"addressType": "shipping"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(address_json(AddressType::Shipping)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/me/addresses"))
        .and(body_partial_json(json!({"addressType": "billing"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(address_json(AddressType::Billing)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/me/payment-methods"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"code": 500, "message": "Internal server error"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST")).and(path("/api/v1/me/orders")).respond_with(ResponseTemplate::new(201)).expect(0).mount(&server).await;

    let api = client(&server);
    let user = Uuid::new_v4();
    let carts = CartStore::new(Arc::new(MemoryStorage::new()));
    carts
        .add(user, CartLine {
            product_id: Uuid::new_v4(),
            name: "Kinky Curly Wig".into(),
            image: None,
            seller_id: None,
            unit_price: Decimal::new(4500, 0),
            selected_length: "16".into(),
            selected_color: "1B".into(),
            quantity: 1,
        })
        .unwrap();
    let form = ShippingForm {
        first_name: "Sara".into(),
        address_line1: "Bole Road 12".into(),
        city: "Addis Ababa".into(),
        phone: "+251911000000".into(),
        ..ShippingForm::default()
    };

    let err = CheckoutWorkflow::new(&api, &carts).place_order(user, &form).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Step { step: CheckoutStep::PaymentMethod, .. }));
    assert_eq!(err.user_message(), "Internal server error");
    assert_eq!(carts.item_count(user).unwrap(), 1);
}
