//! Signed-in buyer resources under `/me`.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use uuid::Uuid;

use super::auth::CurrentUser;
use super::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use crate::domain::aggregates::{Address, Order, PaymentMethod, SellerApplication};
use crate::services::addresses::{CreateAddressRequest, ListAddressesQuery};
use crate::services::checkout::CheckoutRequest;
use crate::services::orders::{CreateOrderRequest, ListOrdersQuery};
use crate::services::payment_methods::{CreatePaymentMethodRequest, ListPaymentMethodsQuery};
use crate::services::sellers::SellerApplicationRequest;
use crate::services::ReasonRequest;
use crate::store::Page;

pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me/addresses", get(list_addresses).post(create_address))
        .route("/me/addresses/:id", delete(delete_address))
        .route("/me/payment-methods", get(list_payment_methods).post(create_payment_method))
        .route("/me/payment-methods/:id", delete(delete_payment_method))
        .route("/me/orders", get(list_orders).post(create_order))
        .route("/me/orders/:id", get(get_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/me/checkout", post(checkout))
        .route("/me/seller-application", post(apply_as_seller))
}

async fn create_address(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(r): ApiJson<CreateAddressRequest>,
) -> ApiResult<(StatusCode, Json<Address>)> {
    Ok((StatusCode::CREATED, Json(s.services.addresses.create(user.id, r).await?)))
}

async fn list_addresses(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<ListAddressesQuery>,
) -> ApiResult<Json<Page<Address>>> {
    Ok(Json(s.services.addresses.list_mine(user.id, q).await?))
}

async fn delete_address(State(s): State<AppState>, CurrentUser(user): CurrentUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.services.addresses.delete_mine(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_payment_method(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(r): ApiJson<CreatePaymentMethodRequest>,
) -> ApiResult<(StatusCode, Json<PaymentMethod>)> {
    Ok((StatusCode::CREATED, Json(s.services.payment_methods.create(user.id, r).await?)))
}

async fn list_payment_methods(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<ListPaymentMethodsQuery>,
) -> ApiResult<Json<Page<PaymentMethod>>> {
    Ok(Json(s.services.payment_methods.list_mine(user.id, q).await?))
}

async fn delete_payment_method(State(s): State<AppState>, CurrentUser(user): CurrentUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.services.payment_methods.delete_mine(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_order(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(r): ApiJson<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    Ok((StatusCode::CREATED, Json(s.services.orders.create(user.id, r).await?)))
}

async fn list_orders(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(q): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Json<Page<Order>>> {
    Ok(Json(s.services.orders.list_mine(user.id, q).await?))
}

async fn get_order(State(s): State<AppState>, CurrentUser(user): CurrentUser, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.get_mine(user.id, id).await?))
}

async fn cancel_order(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<ReasonRequest>>,
) -> ApiResult<Json<Order>> {
    let reason = body.and_then(|ApiJson(r)| r.reason);
    Ok(Json(s.services.orders.cancel(user.id, id, reason).await?))
}

async fn checkout(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    ApiJson(r): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let key = headers.get(IDEMPOTENCY_KEY).and_then(|v| v.to_str().ok());
    Ok((StatusCode::CREATED, Json(s.services.checkout.checkout(user.id, key, r).await?)))
}

async fn apply_as_seller(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(r): ApiJson<SellerApplicationRequest>,
) -> ApiResult<(StatusCode, Json<SellerApplication>)> {
    Ok((StatusCode::CREATED, Json(s.services.sellers.apply(&user, r).await?)))
}
