//! User Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TransitionError;
use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { Buyer, Seller, Admin }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus { #[default] Active, Suspended }

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self { Self::Active => "active", Self::Suspended => "suspended" })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
    pub status: AccountStatus,
    pub store_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User as exposed over the API: everything except credentials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub status: AccountStatus,
    pub store_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn register(first_name: impl Into<String>, last_name: impl Into<String>, email: &str, password_hash: String, roles: Vec<Role>) -> Self {
        let now = Utc::now();
        let mut unique = vec![Role::Buyer];
        for role in roles { if !unique.contains(&role) { unique.push(role); } }
        Self {
            id: Uuid::now_v7(), first_name: first_name.into(), last_name: last_name.into(),
            email: normalize_email(email), password_hash, roles: unique, status: AccountStatus::Active,
            store_name: None, phone: None, created_at: now, updated_at: now,
        }
    }

    pub fn has_role(&self, role: Role) -> bool { self.roles.contains(&role) }
    pub fn is_active(&self) -> bool { self.status == AccountStatus::Active }
    pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name).trim().to_string() }

    pub fn grant(&mut self, role: Role) {
        if !self.has_role(role) { self.roles.push(role); self.touch(); }
    }

    pub fn suspend(&mut self) -> Result<(), TransitionError> {
        if self.status == AccountStatus::Suspended {
            return Err(TransitionError::new("account", self.status, AccountStatus::Suspended));
        }
        self.status = AccountStatus::Suspended;
        self.touch();
        Ok(())
    }

    pub fn unsuspend(&mut self) -> Result<(), TransitionError> {
        if self.status == AccountStatus::Active {
            return Err(TransitionError::new("account", self.status, AccountStatus::Active));
        }
        self.status = AccountStatus::Active;
        self.touch();
        Ok(())
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id, first_name: self.first_name.clone(), last_name: self.last_name.clone(),
            email: self.email.clone(), roles: self.roles.clone(), status: self.status,
            store_name: self.store_name.clone(), phone: self.phone.clone(), created_at: self.created_at,
        }
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

impl Document for User {
    const COLLECTION: Collection = Collection::Users;
    fn id(&self) -> Uuid { self.id }
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

/// Opaque bearer token issued at login.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn issue(user_id: Uuid, token: String) -> Self {
        Self { id: Uuid::now_v7(), token, user_id, created_at: Utc::now() }
    }
}

impl Document for Session {
    const COLLECTION: Collection = Collection::Sessions;
    fn id(&self) -> Uuid { self.id }
}
