//! Product catalog: public listing, seller self-service and admin moderation.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{conflict_as, found, not_blank, resolve_sort};
use crate::domain::aggregates::{ApprovalStatus, Category, Product, TransitionError};
use crate::domain::events::ProductEvent;
use crate::domain::value_objects::Slug;
use crate::publisher::EventPublisher;
use crate::store::{DocumentStore, Filter, Page, PageRequest, Repository, SortDirection};
use crate::{MarketError, Result};

const SORTABLE: &[&str] = &["createdAt", "price", "name", "averageRating", "reviewCount"];
const SEARCHABLE: &[&str] = &["name", "description"];
const SLUG_TAKEN: &str = "A product with this slug already exists";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProductsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub seller_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub status: Option<ApprovalStatus>,
    pub is_published: Option<bool>,
    pub is_featured: Option<bool>,
    pub search: Option<String>,
    #[serde(rename = "sort_by")]
    pub sort_by: Option<String>,
    pub order: Option<SortDirection>,
}

fn non_negative(value: &Decimal) -> std::result::Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut error = ValidationError::new("negative");
        error.message = Some("must not be negative".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(custom = "not_blank")]
    pub name: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "non_negative")]
    pub price: Decimal,
    #[serde(default)]
    pub stock_quantity: u32,
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub available_lengths: Vec<String>,
    #[serde(default)]
    pub available_colors: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Fields a seller may change on their own listing.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(custom = "not_blank")]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom = "non_negative")]
    pub price: Option<Decimal>,
    pub stock_quantity: Option<u32>,
    pub category_id: Option<Uuid>,
    pub available_lengths: Option<Vec<String>>,
    pub available_colors: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

/// Admin edit: everything a seller can change plus moderation fields.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminUpdateProductRequest {
    #[serde(flatten)]
    #[validate]
    pub fields: UpdateProductRequest,
    pub approval_status: Option<ApprovalStatus>,
    pub rejection_reason: Option<String>,
    pub is_featured: Option<bool>,
}

#[derive(Clone)]
pub struct ProductService {
    products: Repository<Product>,
    categories: Repository<Category>,
    events: EventPublisher,
}

impl ProductService {
    pub fn new(store: Arc<dyn DocumentStore>, events: EventPublisher) -> Self {
        Self { products: Repository::new(Arc::clone(&store)), categories: Repository::new(store), events }
    }

    fn filter(query: &ListProductsQuery) -> Filter {
        Filter::new()
            .search(SEARCHABLE, query.search.as_deref())
            .eq_opt("sellerId", query.seller_id)
            .eq_opt("categoryId", query.category_id)
            .eq_opt("isFeatured", query.is_featured)
    }

    async fn page(&self, filter: Filter, query: &ListProductsQuery) -> Result<Page<Product>> {
        let sort = resolve_sort(query.sort_by.as_deref(), query.order, SORTABLE);
        Ok(self.products.page(filter, sort, PageRequest::new(query.page, query.limit)).await?)
    }

    /// Storefront listing: approved and published only, whatever the query asks.
    pub async fn list_public(&self, query: ListProductsQuery) -> Result<Page<Product>> {
        let filter = Self::filter(&query).eq("approvalStatus", ApprovalStatus::Approved).eq("isPublished", true);
        self.page(filter, &query).await
    }

    pub async fn list_all(&self, query: ListProductsQuery) -> Result<Page<Product>> {
        let filter = Self::filter(&query).eq_opt("approvalStatus", query.status).eq_opt("isPublished", query.is_published);
        self.page(filter, &query).await
    }

    pub async fn list_for_seller(&self, seller_id: Uuid, query: ListProductsQuery) -> Result<Page<Product>> {
        let filter = Self::filter(&query)
            .eq("sellerId", seller_id)
            .eq_opt("approvalStatus", query.status)
            .eq_opt("isPublished", query.is_published);
        self.page(filter, &query).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Product> {
        found(self.products.get(id).await?, "Product")
    }

    /// Unlisted products are indistinguishable from missing ones.
    pub async fn get_public(&self, id: Uuid) -> Result<Product> {
        self.get(id).await.and_then(|p| if p.is_listed() { Ok(p) } else { Err(MarketError::NotFound("Product")) })
    }

    async fn owned(&self, seller_id: Uuid, id: Uuid) -> Result<Product> {
        self.get(id).await.and_then(|p| if p.seller_id == seller_id { Ok(p) } else { Err(MarketError::NotFound("Product")) })
    }

    async fn check_category(&self, category_id: Option<Uuid>) -> Result<()> {
        if let Some(id) = category_id {
            found(self.categories.get(id).await?, "Category")?;
        }
        Ok(())
    }

    /// New listings wait for admin approval.
    pub async fn create(&self, seller_id: Uuid, req: CreateProductRequest) -> Result<Product> {
        req.validate()?;
        self.check_category(req.category_id).await?;
        let slug = match req.slug.as_deref() {
            Some(slug) => Slug::new(slug),
            None => Slug::from_name(&req.name),
        }
        .map_err(|e| MarketError::Validation(e.to_string()))?;
        let mut product = Product::submit(seller_id, req.name.trim(), slug, req.price);
        product.description = req.description;
        product.stock_quantity = req.stock_quantity;
        product.category_id = req.category_id;
        product.available_lengths = req.available_lengths;
        product.available_colors = req.available_colors;
        product.features = req.features;
        product.images = req.images;
        self.products.insert(&product).await.map_err(conflict_as(SLUG_TAKEN))?;
        tracing::info!(product_id = %product.id, seller_id = %seller_id, "product submitted");
        Ok(product)
    }

    /// A seller edit sends a reviewed listing back to moderation.
    pub async fn update_own(&self, seller_id: Uuid, id: Uuid, req: UpdateProductRequest) -> Result<Product> {
        req.validate()?;
        let mut product = self.owned(seller_id, id).await?;
        self.apply(&mut product, req).await?;
        let previous = product.approval_status;
        product.reset_approval();
        self.products.replace(&product).await?;
        if previous != ApprovalStatus::Pending {
            self.approval_changed(&product).await;
        }
        Ok(product)
    }

    pub async fn delete_own(&self, seller_id: Uuid, id: Uuid) -> Result<()> {
        self.owned(seller_id, id).await?;
        self.delete(id).await
    }

    pub async fn admin_update(&self, id: Uuid, req: AdminUpdateProductRequest) -> Result<Product> {
        req.validate()?;
        let mut product = self.get(id).await?;
        self.apply(&mut product, req.fields).await?;
        if let Some(featured) = req.is_featured { product.set_featured(featured); }
        let approval_changed = match req.approval_status {
            Some(to) if to != product.approval_status || to == ApprovalStatus::Pending => {
                product.set_approval(to, req.rejection_reason)?;
                true
            }
            _ => false,
        };
        product.touch();
        self.products.replace(&product).await?;
        if approval_changed {
            self.approval_changed(&product).await;
        }
        Ok(product)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.products.delete(id).await? {
            return Err(MarketError::NotFound("Product"));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    pub async fn set_featured(&self, id: Uuid, featured: bool) -> Result<Product> {
        let mut product = self.get(id).await?;
        product.set_featured(featured);
        self.products.replace(&product).await?;
        Ok(product)
    }

    pub async fn approve(&self, id: Uuid) -> Result<Product> {
        self.moderate(id, |p| p.approve()).await
    }

    pub async fn reject(&self, id: Uuid, reason: Option<String>) -> Result<Product> {
        self.moderate(id, |p| p.reject(reason)).await
    }

    pub async fn reset_approval(&self, id: Uuid) -> Result<Product> {
        self.moderate(id, |p| { p.reset_approval(); Ok(()) }).await
    }

    /// Store the rating aggregate computed from approved reviews.
    pub(crate) async fn record_rating(&self, id: Uuid, ratings: &[u8]) -> Result<()> {
        let Some(mut product) = self.products.get(id).await? else { return Ok(()) };
        product.record_rating(ratings);
        self.products.replace(&product).await?;
        Ok(())
    }

    async fn moderate(
        &self,
        id: Uuid,
        change: impl FnOnce(&mut Product) -> std::result::Result<(), TransitionError>,
    ) -> Result<Product> {
        let mut product = self.get(id).await?;
        change(&mut product)?;
        self.products.replace(&product).await?;
        self.approval_changed(&product).await;
        Ok(product)
    }

    async fn apply(&self, product: &mut Product, req: UpdateProductRequest) -> Result<()> {
        if req.category_id.is_some() {
            self.check_category(req.category_id).await?;
            product.category_id = req.category_id;
        }
        if let Some(name) = req.name { product.name = name.trim().to_string(); }
        if let Some(description) = req.description { product.description = description; }
        if let Some(price) = req.price { product.price = price; }
        if let Some(stock) = req.stock_quantity { product.stock_quantity = stock; }
        if let Some(lengths) = req.available_lengths { product.available_lengths = lengths; }
        if let Some(colors) = req.available_colors { product.available_colors = colors; }
        if let Some(features) = req.features { product.features = features; }
        if let Some(images) = req.images { product.images = images; }
        if let Some(published) = req.is_published { product.is_published = published; }
        product.touch();
        Ok(())
    }

    async fn approval_changed(&self, product: &Product) {
        tracing::info!(product_id = %product.id, status = %product.approval_status, "product approval changed");
        self.events
            .publish(ProductEvent::ApprovalChanged {
                product_id: product.id,
                seller_id: product.seller_id,
                status: product.approval_status,
            })
            .await;
    }
}
