//! Public storefront: products, categories and product reviews.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use super::auth::CurrentUser;
use super::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use crate::domain::aggregates::{Category, Product, Review};
use crate::services::categories::ListCategoriesQuery;
use crate::services::products::ListProductsQuery;
use crate::services::reviews::{CreateReviewRequest, ListReviewsQuery};
use crate::store::Page;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id/reviews", get(list_reviews).post(create_review))
        .route("/categories", get(list_categories))
        .route("/categories/:id", get(get_category))
}

async fn list_products(State(s): State<AppState>, ApiQuery(q): ApiQuery<ListProductsQuery>) -> ApiResult<Json<Page<Product>>> {
    Ok(Json(s.services.products.list_public(q).await?))
}

async fn get_product(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(s.services.products.get_public(id).await?))
}

async fn list_reviews(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(q): ApiQuery<ListReviewsQuery>,
) -> ApiResult<Json<Page<Review>>> {
    Ok(Json(s.services.reviews.list_for_product(id, q).await?))
}

async fn create_review(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(r): ApiJson<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    Ok((StatusCode::CREATED, Json(s.services.reviews.create(user.id, id, r).await?)))
}

async fn list_categories(State(s): State<AppState>, ApiQuery(q): ApiQuery<ListCategoriesQuery>) -> ApiResult<Json<Page<Category>>> {
    Ok(Json(s.services.categories.list(q).await?))
}

async fn get_category(State(s): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Category>> {
    Ok(Json(s.services.categories.get(id).await?))
}
