//! Seller self-service: own products and store orders.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::{Json, Router};
use uuid::Uuid;

use super::auth::RequireSeller;
use super::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use crate::domain::aggregates::{Order, Product};
use crate::services::orders::{ListOrdersQuery, UpdateOrderStatusRequest};
use crate::services::products::{CreateProductRequest, ListProductsQuery, UpdateProductRequest};
use crate::store::Page;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me/products", get(list_products).post(create_product))
        .route("/me/products/:id", put(update_product).delete(delete_product))
        .route("/me/store/orders", get(list_orders))
        .route("/me/store/orders/:id/status", patch(update_order_status))
}

async fn list_products(
    State(s): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiQuery(q): ApiQuery<ListProductsQuery>,
) -> ApiResult<Json<Page<Product>>> {
    Ok(Json(s.services.products.list_for_seller(seller.id, q).await?))
}

async fn create_product(
    State(s): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiJson(r): ApiJson<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    Ok((StatusCode::CREATED, Json(s.services.products.create(seller.id, r).await?)))
}

async fn update_product(
    State(s): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateProductRequest>,
) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.products.update_own(seller.id, id, r).await?))
}

async fn delete_product(State(s): State<AppState>, RequireSeller(seller): RequireSeller, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.services.products.delete_own(seller.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_orders(
    State(s): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiQuery(q): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Json<Page<Order>>> {
    Ok(Json(s.services.orders.list_for_seller(seller.id, q).await?))
}

async fn update_order_status(
    State(s): State<AppState>,
    RequireSeller(seller): RequireSeller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateOrderStatusRequest>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.seller_update_status(seller.id, id, r).await?))
}
