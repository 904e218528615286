//! Typed HTTP client for the marketplace API.
//!
//! Requests carry the bearer token of the persisted session when one
//! exists. Failed requests are logged here and surface as [`ClientError`]
//! with the server's `message` when it sent one.

pub mod session;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::api::{ErrorBody, API_PREFIX};
use crate::domain::aggregates::{Address, Category, Order, PaymentMethod, Product, UserProfile};
use crate::services::addresses::CreateAddressRequest;
use crate::services::auth::{AuthSession, LoginRequest, RegisterRequest};
use crate::services::checkout::CheckoutRequest;
use crate::services::orders::{CreateOrderRequest, ListOrdersQuery};
use crate::services::payment_methods::CreatePaymentMethodRequest;
use crate::services::products::ListProductsQuery;
use crate::services::ReasonRequest;
use crate::store::Page;

pub use session::{CartStore, FileStorage, KeyValueStorage, MemoryStorage, SessionStore, StorageError};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response. `message` is the server's, or a generic one when the
    /// body was not an error body.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message the server attached to a rejected request.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// The calls the client-side checkout workflow makes.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    async fn create_address(&self, req: &CreateAddressRequest) -> Result<Address, ClientError>;
    async fn create_payment_method(&self, req: &CreatePaymentMethodRequest) -> Result<PaymentMethod, ClientError>;
    async fn create_order(&self, req: &CreateOrderRequest) -> Result<Order, ClientError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    /// `server_url` is the scheme and authority, e.g. `http://localhost:8083`.
    pub fn new(server_url: &str, session: SessionStore) -> Self {
        Self::with_http(reqwest::Client::new(), server_url, session)
    }

    pub fn with_http(http: reqwest::Client, server_url: &str, session: SessionStore) -> Self {
        let base_url = format!("{}{API_PREFIX}", server_url.trim_end_matches('/'));
        Self { http, base_url, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{path}", self.base_url));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "request failed");
            ClientError::Transport(e)
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => format!("Request failed with status {}", status.as_u16()),
        };
        tracing::warn!(status = status.as_u16(), %message, "request rejected");
        Err(ClientError::Api { status: status.as_u16(), message })
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ClientError> {
        let response = self.send(builder).await?;
        response.json::<T>().await.map_err(|e| {
            tracing::warn!(error = %e, "could not decode response");
            ClientError::Decode(e.to_string())
        })
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        self.fetch(self.request(Method::POST, path).json(body)).await
    }

    // --- session ---

    pub async fn register(&self, req: &RegisterRequest) -> Result<AuthSession, ClientError> {
        let session: AuthSession = self.post_json("/auth/register", req).await?;
        self.session.save(&session)?;
        Ok(session)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ClientError> {
        let req = LoginRequest { email: email.to_string(), password: password.to_string() };
        let session: AuthSession = self.post_json("/auth/login", &req).await?;
        self.session.save(&session)?;
        tracing::debug!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    /// Revokes the token server-side when possible. The local session is
    /// cleared either way.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if self.session.token().is_some() {
            if let Err(e) = self.send(self.request(Method::POST, "/auth/logout")).await {
                tracing::warn!(error = %e, "server logout failed, clearing local session anyway");
            }
        }
        self.session.clear()?;
        Ok(())
    }

    /// Reload the signed-in profile and store it with the current token.
    pub async fn refresh(&self) -> Result<Option<UserProfile>, ClientError> {
        let Some(mut session) = self.session.current()? else {
            return Ok(None);
        };
        match self.fetch::<UserProfile>(self.request(Method::GET, "/auth/me")).await {
            Ok(profile) => {
                session.user = profile.clone();
                self.session.save(&session)?;
                Ok(Some(profile))
            }
            Err(e) if e.status() == Some(401) => {
                self.session.clear()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        match self.session.current() {
            Ok(session) => session.map(|s| s.user),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable session");
                None
            }
        }
    }

    // --- catalog ---

    pub async fn list_products(&self, query: &ListProductsQuery) -> Result<Page<Product>, ClientError> {
        self.fetch(self.request(Method::GET, "/products").query(query)).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, ClientError> {
        self.fetch(self.request(Method::GET, &format!("/products/{id}"))).await
    }

    pub async fn list_categories(&self) -> Result<Page<Category>, ClientError> {
        self.fetch(self.request(Method::GET, "/categories")).await
    }

    // --- orders ---

    pub async fn list_my_orders(&self, query: &ListOrdersQuery) -> Result<Page<Order>, ClientError> {
        self.fetch(self.request(Method::GET, "/me/orders").query(query)).await
    }

    pub async fn cancel_order(&self, id: Uuid, reason: Option<String>) -> Result<Order, ClientError> {
        self.post_json(&format!("/orders/{id}/cancel"), &ReasonRequest { reason }).await
    }

    /// Single-call checkout. Retrying with the same key returns the first order.
    pub async fn checkout(&self, req: &CheckoutRequest, idempotency_key: Option<&str>) -> Result<Order, ClientError> {
        let mut builder = self.request(Method::POST, "/me/checkout").json(req);
        if let Some(key) = idempotency_key {
            builder = builder.header(IDEMPOTENCY_HEADER, key);
        }
        self.fetch(builder).await
    }
}

#[async_trait]
impl MarketplaceApi for ApiClient {
    async fn create_address(&self, req: &CreateAddressRequest) -> Result<Address, ClientError> {
        self.post_json("/me/addresses", req).await
    }

    async fn create_payment_method(&self, req: &CreatePaymentMethodRequest) -> Result<PaymentMethod, ClientError> {
        self.post_json("/me/payment-methods", req).await
    }

    async fn create_order(&self, req: &CreateOrderRequest) -> Result<Order, ClientError> {
        self.post_json("/me/orders", req).await
    }
}
