//! Registration, login and bearer-token sessions.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{conflict_as, not_blank};
use crate::domain::aggregates::user::normalize_email;
use crate::domain::aggregates::{Role, Session, User, UserProfile};
use crate::store::{DocumentStore, Filter, Repository};
use crate::{MarketError, Result};

const TOKEN_BYTES: usize = 32;

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(custom = "not_blank")]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(email(message = "must be a valid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom = "not_blank")]
    pub email: String,
    #[validate(custom = "not_blank")]
    pub password: String,
}

/// Returned by register and login.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: UserProfile,
    pub access_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Repository<User>,
    sessions: Repository<Session>,
}

impl AuthService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { users: Repository::new(Arc::clone(&store)), sessions: Repository::new(store) }
    }

    /// Self-registration. `admin` is never granted this way.
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthSession> {
        req.validate()?;
        let roles = req.roles.into_iter().filter(|r| *r != Role::Admin).collect();
        let hash = hash_password(&req.password)?;
        let user = User::register(req.first_name.trim(), req.last_name.trim(), &req.email, hash, roles);
        self.users.insert(&user).await.map_err(conflict_as("Email already taken"))?;
        tracing::info!(user_id = %user.id, "user registered");
        self.open_session(&user).await
    }

    pub async fn login(&self, req: LoginRequest) -> Result<AuthSession> {
        req.validate()?;
        let user = self
            .users
            .find_one(Filter::new().eq("email", normalize_email(&req.email)))
            .await?
            .ok_or_else(invalid_credentials)?;
        if !verify_password(&req.password, &user.password_hash)? {
            return Err(invalid_credentials());
        }
        if !user.is_active() {
            return Err(MarketError::Forbidden("Your account has been suspended".to_string()));
        }
        tracing::info!(user_id = %user.id, "user logged in");
        self.open_session(&user).await
    }

    /// Revoke a token. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<()> {
        if let Some(session) = self.sessions.find_one(Filter::new().eq("token", token)).await? {
            self.sessions.delete(session.id).await?;
            tracing::info!(user_id = %session.user_id, "user logged out");
        }
        Ok(())
    }

    /// Resolve a bearer token to an active user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let unauthorized = || MarketError::Unauthorized("Please authenticate".to_string());
        let session = self.sessions.find_one(Filter::new().eq("token", token)).await?.ok_or_else(unauthorized)?;
        let user = self.users.get(session.user_id).await?.ok_or_else(unauthorized)?;
        if !user.is_active() {
            return Err(MarketError::Forbidden("Your account has been suspended".to_string()));
        }
        Ok(user)
    }

    /// Create an admin account unless the email is already registered.
    /// Returns `None` when the account already existed.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<Option<UserProfile>> {
        if self.users.find_one(Filter::new().eq("email", normalize_email(email))).await?.is_some() {
            return Ok(None);
        }
        let hash = hash_password(password)?;
        let user = User::register("Platform", "Admin", email, hash, vec![Role::Admin]);
        self.users.insert(&user).await.map_err(conflict_as("Email already taken"))?;
        tracing::info!(user_id = %user.id, "admin account created");
        Ok(Some(user.profile()))
    }

    async fn open_session(&self, user: &User) -> Result<AuthSession> {
        let session = Session::issue(user.id, generate_token());
        self.sessions.insert(&session).await?;
        Ok(AuthSession { user: user.profile(), access_token: session.token })
    }
}

fn invalid_credentials() -> MarketError {
    MarketError::Unauthorized("Incorrect email or password".to_string())
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| MarketError::Internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| MarketError::Internal(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn service() -> AuthService { AuthService::new(Arc::new(InMemoryStore::new())) }

    fn register_request(email: &str, roles: Vec<Role>) -> RegisterRequest {
        RegisterRequest { first_name: "Hana".into(), last_name: "Tesfaye".into(), email: email.into(), password: "correct horse".into(), roles }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("s3cret-pass").unwrap();
        assert!(verify_password("s3cret-pass", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let auth = service();
        let registered = auth.register(register_request("hana@example.com", vec![Role::Seller, Role::Admin])).await.unwrap();
        assert_eq!(registered.user.roles, vec![Role::Buyer, Role::Seller]);

        let session = auth.login(LoginRequest { email: "HANA@example.com".into(), password: "correct horse".into() }).await.unwrap();
        let user = auth.authenticate(&session.access_token).await.unwrap();
        assert_eq!(user.id, registered.user.id);

        auth.logout(&session.access_token).await.unwrap();
        assert!(matches!(auth.authenticate(&session.access_token).await, Err(MarketError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let auth = service();
        auth.register(register_request("dup@example.com", vec![])).await.unwrap();
        let err = auth.register(register_request("dup@example.com", vec![])).await.unwrap_err();
        assert!(matches!(err, MarketError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let auth = service();
        auth.register(register_request("x@example.com", vec![])).await.unwrap();
        let err = auth.login(LoginRequest { email: "x@example.com".into(), password: "nope-nope".into() }).await.unwrap_err();
        assert!(matches!(err, MarketError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let auth = service();
        let admin = auth.bootstrap_admin("admin@wigvana.com", "admin-password").await.unwrap().unwrap();
        assert!(admin.roles.contains(&Role::Admin));
        assert!(auth.bootstrap_admin("admin@wigvana.com", "admin-password").await.unwrap().is_none());
    }
}
