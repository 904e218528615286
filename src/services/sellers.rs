//! Seller applications.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{found, not_blank};
use crate::domain::aggregates::{ApplicationStatus, Role, SellerApplication, User};
use crate::domain::events::SellerEvent;
use crate::publisher::EventPublisher;
use crate::store::{DocumentStore, Filter, Page, PageRequest, Repository, Sort};
use crate::{MarketError, Result};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SellerApplicationRequest {
    #[validate(custom = "not_blank")]
    pub store_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListApplicationsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ApplicationStatus>,
    pub user_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct SellerService {
    applications: Repository<SellerApplication>,
    users: Repository<User>,
    events: EventPublisher,
}

impl SellerService {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventPublisher) -> Self {
        Self { applications: Repository::new(Arc::clone(&store)), users: Repository::new(store), events }
    }

    pub async fn apply(&self, user: &User, req: SellerApplicationRequest) -> Result<SellerApplication> {
        req.validate()?;
        if user.has_role(Role::Seller) {
            return Err(MarketError::Conflict("You are already a seller".to_string()));
        }
        let pending = Filter::new().eq("userId", user.id).eq("status", ApplicationStatus::Pending);
        if self.applications.count(&pending).await? > 0 {
            return Err(MarketError::Conflict("You already have a pending seller application".to_string()));
        }
        let application = SellerApplication::submit(user.id, req.store_name.trim(), req.description);
        self.applications.insert(&application).await?;
        tracing::info!(user_id = %user.id, application_id = %application.id, "seller application submitted");
        Ok(application)
    }

    pub async fn list(&self, query: ListApplicationsQuery) -> Result<Page<SellerApplication>> {
        let filter = Filter::new().eq_opt("status", query.status).eq_opt("userId", query.user_id);
        Ok(self.applications.page(filter, Sort::newest_first(), PageRequest::new(query.page, query.limit)).await?)
    }

    /// Approving grants the seller role and copies the store name onto the user.
    pub async fn approve(&self, admin_id: Uuid, application_id: Uuid) -> Result<SellerApplication> {
        let mut application = found(self.applications.get(application_id).await?, "Seller application")?;
        let mut user = found(self.users.get(application.user_id).await?, "User")?;
        application.approve(admin_id)?;
        user.grant(Role::Seller);
        user.store_name = Some(application.store_name.clone());
        user.touch();
        self.applications.replace(&application).await?;
        self.users.replace(&user).await?;
        self.reviewed(&application).await;
        Ok(application)
    }

    pub async fn reject(&self, admin_id: Uuid, application_id: Uuid, reason: Option<String>) -> Result<SellerApplication> {
        let mut application = found(self.applications.get(application_id).await?, "Seller application")?;
        application.reject(admin_id, reason)?;
        self.applications.replace(&application).await?;
        self.reviewed(&application).await;
        Ok(application)
    }

    async fn reviewed(&self, application: &SellerApplication) {
        tracing::info!(application_id = %application.id, status = %application.status, "seller application reviewed");
        self.events
            .publish(SellerEvent::ApplicationReviewed {
                application_id: application.id,
                user_id: application.user_id,
                status: application.status,
            })
            .await;
    }
}
