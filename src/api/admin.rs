//! Admin back-office under `/admin`. Every handler requires the admin role.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use super::auth::RequireAdmin;
use super::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use crate::domain::aggregates::{Category, Order, Product, Review, SellerApplication, UserProfile};
use crate::services::categories::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::services::orders::{AdminListOrdersQuery, UpdateOrderStatusRequest};
use crate::services::products::{AdminUpdateProductRequest, ListProductsQuery};
use crate::services::reviews::{ListReviewsQuery, ReviewStatusRequest};
use crate::services::sellers::ListApplicationsQuery;
use crate::services::stats::DashboardStats;
use crate::services::users::{ListUsersQuery, UpdateUserRequest};
use crate::services::ReasonRequest;
use crate::store::Page;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(get_user).put(update_user))
        .route("/admin/users/:id/suspend", post(suspend_user))
        .route("/admin/users/:id/unsuspend", post(unsuspend_user))
        .route("/admin/seller-applications", get(list_applications))
        .route("/admin/seller-applications/:id/approve", post(approve_application))
        .route("/admin/seller-applications/:id/reject", post(reject_application))
        .route("/admin/products", get(list_products))
        .route("/admin/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/admin/products/:id/feature", post(feature_product))
        .route("/admin/products/:id/unfeature", post(unfeature_product))
        .route("/admin/products/:id/approve", post(approve_product))
        .route("/admin/products/:id/reject", post(reject_product))
        .route("/admin/products/:id/reset", post(reset_product))
        .route("/admin/categories", post(create_category))
        .route("/admin/categories/:id", put(update_category).delete(delete_category))
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/:id", get(get_order))
        .route("/admin/orders/:id/status", patch(update_order_status))
        .route("/admin/orders/:id/refund", post(refund_order))
        .route("/admin/reviews", get(list_reviews))
        .route("/admin/reviews/:id", delete(delete_review))
        .route("/admin/reviews/:id/status", patch(update_review_status))
}

fn reason(body: Option<ApiJson<ReasonRequest>>) -> Option<String> {
    body.and_then(|ApiJson(r)| r.reason)
}

async fn stats(State(s): State<AppState>, RequireAdmin(_): RequireAdmin) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(s.services.stats.dashboard().await?))
}

// --- users ---

async fn list_users(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiQuery(q): ApiQuery<ListUsersQuery>) -> ApiResult<Json<Page<UserProfile>>> {
    Ok(Json(s.services.users.list(q).await?))
}

async fn get_user(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<UserProfile>> {
    Ok(Json(s.services.users.profile(id).await?))
}

async fn update_user(
    State(s): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(s.services.users.update(id, r).await?))
}

async fn suspend_user(State(s): State<AppState>, RequireAdmin(admin): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<UserProfile>> {
    if admin.id == id {
        return Err(crate::MarketError::Validation("You cannot suspend your own account".to_string()).into());
    }
    Ok(Json(s.services.users.suspend(id).await?))
}

async fn unsuspend_user(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<UserProfile>> {
    Ok(Json(s.services.users.unsuspend(id).await?))
}

// --- seller applications ---

async fn list_applications(
    State(s): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiQuery(q): ApiQuery<ListApplicationsQuery>,
) -> ApiResult<Json<Page<SellerApplication>>> {
    Ok(Json(s.services.sellers.list(q).await?))
}

async fn approve_application(State(s): State<AppState>, RequireAdmin(admin): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<SellerApplication>> {
    Ok(Json(s.services.sellers.approve(admin.id, id).await?))
}

async fn reject_application(
    State(s): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<ReasonRequest>>,
) -> ApiResult<Json<SellerApplication>> {
    Ok(Json(s.services.sellers.reject(admin.id, id, reason(body)).await?))
}

// --- products ---

async fn list_products(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiQuery(q): ApiQuery<ListProductsQuery>) -> ApiResult<Json<Page<Product>>> {
    Ok(Json(s.services.products.list_all(q).await?))
}

async fn get_product(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.products.get(id).await?))
}

async fn update_product(
    State(s): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<AdminUpdateProductRequest>,
) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.products.admin_update(id, r).await?))
}

async fn delete_product(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.services.products.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn feature_product(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.products.set_featured(id, true).await?))
}

async fn unfeature_product(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.products.set_featured(id, false).await?))
}

async fn approve_product(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.products.approve(id).await?))
}

async fn reject_product(
    State(s): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<ReasonRequest>>,
) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.products.reject(id, reason(body)).await?))
}

async fn reset_product(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.products.reset_approval(id).await?))
}

// --- categories ---

async fn create_category(
    State(s): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiJson(r): ApiJson<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    Ok((StatusCode::CREATED, Json(s.services.categories.create(r).await?)))
}

async fn update_category(
    State(s): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateCategoryRequest>,
) -> ApiResult<Json<Category>> {
    Ok(Json(s.services.categories.update(id, r).await?))
}

async fn delete_category(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.services.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- orders ---

async fn list_orders(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiQuery(q): ApiQuery<AdminListOrdersQuery>) -> ApiResult<Json<Page<Order>>> {
    Ok(Json(s.services.orders.list_all(q).await?))
}

async fn get_order(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.admin_get(id).await?))
}

async fn update_order_status(
    State(s): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<UpdateOrderStatusRequest>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.admin_update_status(id, r).await?))
}

async fn refund_order(
    State(s): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<ReasonRequest>>,
) -> ApiResult<Json<Order>> {
    Ok(Json(s.services.orders.refund(id, reason(body)).await?))
}

// --- reviews ---

async fn list_reviews(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiQuery(q): ApiQuery<ListReviewsQuery>) -> ApiResult<Json<Page<Review>>> {
    Ok(Json(s.services.reviews.list_all(q).await?))
}

async fn delete_review(State(s): State<AppState>, RequireAdmin(_): RequireAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<StatusCode> {
    s.services.reviews.admin_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_review_status(
    State(s): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<ReviewStatusRequest>,
) -> ApiResult<Json<Review>> {
    Ok(Json(s.services.reviews.update_status(id, r).await?))
}
