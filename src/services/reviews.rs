//! Product reviews and their moderation.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::products::ProductService;
use super::{found, resolve_sort};
use crate::domain::aggregates::Review;
use crate::store::{DocumentStore, Filter, FindOptions, Page, PageRequest, Repository, SortDirection};
use crate::{MarketError, Result};

const SORTABLE: &[&str] = &["createdAt", "rating"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub user_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub is_approved: Option<bool>,
    pub rating: Option<u8>,
    #[serde(rename = "sort_by")]
    pub sort_by: Option<String>,
    pub order: Option<SortDirection>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: u8,
    pub title: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStatusRequest {
    pub is_approved: bool,
}

#[derive(Clone)]
pub struct ReviewService {
    reviews: Repository<Review>,
    products: ProductService,
}

impl ReviewService {
    pub fn new(store: Arc<dyn DocumentStore>, products: ProductService) -> Self {
        Self { reviews: Repository::new(store), products }
    }

    /// Approved reviews of a listed product.
    pub async fn list_for_product(&self, product_id: Uuid, query: ListReviewsQuery) -> Result<Page<Review>> {
        self.products.get_public(product_id).await?;
        let filter = Filter::new().eq("productId", product_id).eq("isApproved", true).eq_opt("rating", query.rating);
        let sort = resolve_sort(query.sort_by.as_deref(), query.order, SORTABLE);
        Ok(self.reviews.page(filter, sort, PageRequest::new(query.page, query.limit)).await?)
    }

    /// One review per user and product; it stays hidden until approved.
    pub async fn create(&self, user_id: Uuid, product_id: Uuid, req: CreateReviewRequest) -> Result<Review> {
        req.validate()?;
        self.products.get_public(product_id).await?;
        let existing = Filter::new().eq("productId", product_id).eq("userId", user_id);
        if self.reviews.count(&existing).await? > 0 {
            return Err(MarketError::Conflict("You have already reviewed this product".to_string()));
        }
        let review = Review::write(product_id, user_id, req.rating, req.title, req.comment);
        self.reviews.insert(&review).await?;
        tracing::info!(review_id = %review.id, product_id = %product_id, user_id = %user_id, "review submitted");
        Ok(review)
    }

    pub async fn list_all(&self, query: ListReviewsQuery) -> Result<Page<Review>> {
        let filter = Filter::new()
            .eq_opt("userId", query.user_id)
            .eq_opt("productId", query.product_id)
            .eq_opt("isApproved", query.is_approved)
            .eq_opt("rating", query.rating);
        let sort = resolve_sort(query.sort_by.as_deref(), query.order, SORTABLE);
        Ok(self.reviews.page(filter, sort, PageRequest::new(query.page, query.limit)).await?)
    }

    pub async fn update_status(&self, id: Uuid, req: ReviewStatusRequest) -> Result<Review> {
        let mut review = found(self.reviews.get(id).await?, "Review")?;
        review.is_approved = req.is_approved;
        review.updated_at = chrono::Utc::now();
        self.reviews.replace(&review).await?;
        tracing::info!(review_id = %id, approved = review.is_approved, "review moderated");
        self.refresh_rating(review.product_id).await?;
        Ok(review)
    }

    pub async fn admin_delete(&self, id: Uuid) -> Result<()> {
        let review = found(self.reviews.get(id).await?, "Review")?;
        if !self.reviews.delete(id).await? {
            return Err(MarketError::NotFound("Review"));
        }
        tracing::info!(review_id = %id, "review deleted");
        if review.is_approved {
            self.refresh_rating(review.product_id).await?;
        }
        Ok(())
    }

    async fn refresh_rating(&self, product_id: Uuid) -> Result<()> {
        let approved = self
            .reviews
            .find(&FindOptions::filtered(Filter::new().eq("productId", product_id).eq("isApproved", true)))
            .await?;
        let ratings: Vec<u8> = approved.iter().map(|r| r.rating).collect();
        self.products.record_rating(product_id, &ratings).await
    }
}
