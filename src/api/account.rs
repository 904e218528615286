//! `/auth` endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::auth::{BearerToken, CurrentUser};
use super::{ApiJson, ApiResult, AppState};
use crate::domain::aggregates::UserProfile;
use crate::services::auth::{AuthSession, LoginRequest, RegisterRequest};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

async fn register(State(s): State<AppState>, ApiJson(r): ApiJson<RegisterRequest>) -> ApiResult<(StatusCode, Json<AuthSession>)> {
    Ok((StatusCode::CREATED, Json(s.services.auth.register(r).await?)))
}

async fn login(State(s): State<AppState>, ApiJson(r): ApiJson<LoginRequest>) -> ApiResult<Json<AuthSession>> {
    Ok(Json(s.services.auth.login(r).await?))
}

async fn logout(State(s): State<AppState>, BearerToken(token): BearerToken) -> ApiResult<StatusCode> {
    s.services.auth.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(user.profile())
}
