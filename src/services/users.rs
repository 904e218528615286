//! User administration.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{conflict_as, found, resolve_sort};
use crate::domain::aggregates::user::normalize_email;
use crate::domain::aggregates::{AccountStatus, Role, User, UserProfile};
use crate::domain::events::UserEvent;
use crate::publisher::EventPublisher;
use crate::store::{DocumentStore, Filter, Page, PageRequest, Repository, SortDirection};
use crate::Result;

const SORTABLE: &[&str] = &["createdAt", "firstName", "lastName", "email"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub search: Option<String>,
    #[serde(rename = "sort_by")]
    pub sort_by: Option<String>,
    pub order: Option<SortDirection>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1))]
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub store_name: Option<String>,
    pub roles: Option<Vec<Role>>,
}

#[derive(Clone)]
pub struct UserService {
    users: Repository<User>,
    events: EventPublisher,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventPublisher) -> Self {
        Self { users: Repository::new(store), events }
    }

    pub async fn list(&self, query: ListUsersQuery) -> Result<Page<UserProfile>> {
        let filter = Filter::new()
            .search(&["firstName", "lastName", "email"], query.search.as_deref())
            .eq_opt("status", query.status);
        let filter = match query.role {
            Some(role) => filter.contains("roles", role),
            None => filter,
        };
        let sort = resolve_sort(query.sort_by.as_deref(), query.order, SORTABLE);
        let page = self.users.page(filter, sort, PageRequest::new(query.page, query.limit)).await?;
        Ok(page.map(|u| u.profile()))
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        found(self.users.get(id).await?, "User")
    }

    pub async fn profile(&self, id: Uuid) -> Result<UserProfile> {
        Ok(self.get(id).await?.profile())
    }

    /// Admin edit: only the provided fields change.
    pub async fn update(&self, id: Uuid, req: UpdateUserRequest) -> Result<UserProfile> {
        req.validate()?;
        let mut user = self.get(id).await?;
        if let Some(first_name) = req.first_name { user.first_name = first_name; }
        if let Some(last_name) = req.last_name { user.last_name = last_name; }
        if let Some(email) = req.email { user.email = normalize_email(&email); }
        if let Some(phone) = req.phone { user.phone = Some(phone); }
        if let Some(store_name) = req.store_name { user.store_name = Some(store_name); }
        if let Some(roles) = req.roles {
            user.roles = vec![Role::Buyer];
            for role in roles { user.grant(role); }
        }
        user.touch();
        self.users.replace(&user).await.map_err(conflict_as("Email already taken"))?;
        Ok(user.profile())
    }

    pub async fn suspend(&self, id: Uuid) -> Result<UserProfile> {
        let mut user = self.get(id).await?;
        user.suspend()?;
        self.users.replace(&user).await?;
        tracing::info!(user_id = %id, "user suspended");
        self.events.publish(UserEvent::Suspended { user_id: id }).await;
        Ok(user.profile())
    }

    pub async fn unsuspend(&self, id: Uuid) -> Result<UserProfile> {
        let mut user = self.get(id).await?;
        user.unsuspend()?;
        self.users.replace(&user).await?;
        tracing::info!(user_id = %id, "user unsuspended");
        self.events.publish(UserEvent::Unsuspended { user_id: id }).await;
        Ok(user.profile())
    }
}
