//! REST API.
//!
//! All resources live under `/api/v1`. Controllers pick whitelisted
//! parameters, call one service method and map the result to a status code.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::publisher::EventPublisher;
use crate::services::Services;
use crate::store::DocumentStore;

pub mod account;
pub mod admin;
pub mod auth;
pub mod buyer;
pub mod catalog;
pub mod error;
pub mod seller;

pub use error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult, ErrorBody};

pub const API_PREFIX: &str = "/api/v1";

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventPublisher) -> Self {
        Self { services: Services::new(store, events) }
    }
}

pub fn router(state: AppState, cors_permissive: bool) -> Router {
    let api = Router::new()
        .merge(account::routes())
        .merge(catalog::routes())
        .merge(buyer::routes())
        .merge(seller::routes())
        .merge(admin::routes());

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "wigvana"})) }))
        .nest(API_PREFIX, api);
    let app = if cors_permissive {
        app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
    } else {
        app.layer(TraceLayer::new_for_http())
    };
    app.with_state(state)
}
