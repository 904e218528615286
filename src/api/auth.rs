//! Bearer-token extractors.
//!
//! Handlers take [`CurrentUser`], [`RequireSeller`] or [`RequireAdmin`] as
//! an argument; the role guard runs before the handler body.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::error::ApiError;
use super::AppState;
use crate::domain::aggregates::{Role, User};
use crate::MarketError;

fn unauthenticated() -> ApiError {
    MarketError::Unauthorized("Please authenticate".to_string()).into()
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Raw bearer token, for logout.
pub struct BearerToken(pub String);

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer_token(&parts.headers).map(|t| Self(t.to_string())).ok_or_else(unauthenticated)
    }
}

/// Any signed-in, active user.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(unauthenticated)?;
        let user = state.services.auth.authenticate(token).await?;
        Ok(Self(user))
    }
}

async fn require_role(parts: &mut Parts, state: &AppState, role: Role) -> Result<User, ApiError> {
    let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
    if !user.has_role(role) {
        return Err(MarketError::Forbidden("Forbidden".to_string()).into());
    }
    Ok(user)
}

pub struct RequireSeller(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Seller).await.map(Self)
    }
}

pub struct RequireAdmin(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, Role::Admin).await.map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer   xyz "));
        assert_eq!(bearer_token(&headers), Some("xyz"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
