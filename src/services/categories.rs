//! Category catalog.

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{conflict_as, found, not_blank};
use crate::domain::aggregates::Category;
use crate::domain::value_objects::Slug;
use crate::store::{DocumentStore, Filter, Page, PageRequest, Repository, Sort};
use crate::{MarketError, Result};

const SLUG_TAKEN: &str = "Category slug already exists";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCategoriesQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub parent_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    #[validate(custom = "not_blank")]
    pub name: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryRequest {
    #[validate(custom = "not_blank")]
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub display_order: Option<i32>,
}

#[derive(Clone)]
pub struct CategoryService {
    categories: Repository<Category>,
}

fn slug_of(explicit: Option<&str>, name: &str) -> Result<Slug> {
    match explicit {
        Some(slug) => Slug::new(slug),
        None => Slug::from_name(name),
    }
    .map_err(|e| MarketError::Validation(e.to_string()))
}

impl CategoryService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { categories: Repository::new(store) }
    }

    /// Ordered by `displayOrder`, the way the storefront menu shows them.
    pub async fn list(&self, query: ListCategoriesQuery) -> Result<Page<Category>> {
        let filter = Filter::new()
            .search(&["name", "description"], query.search.as_deref())
            .eq_opt("parentId", query.parent_id)
            .eq_opt("isActive", query.is_active);
        Ok(self.categories.page(filter, Sort::asc("displayOrder"), PageRequest::new(query.page, query.limit)).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Category> {
        found(self.categories.get(id).await?, "Category")
    }

    pub async fn count(&self) -> Result<u64> {
        Ok(self.categories.count(&Filter::new()).await?)
    }

    pub async fn create(&self, req: CreateCategoryRequest) -> Result<Category> {
        req.validate()?;
        let slug = slug_of(req.slug.as_deref(), &req.name)?;
        if let Some(parent_id) = req.parent_id {
            self.get(parent_id).await?;
        }
        let mut category = Category::create(req.name.trim(), slug);
        category.description = req.description;
        category.parent_id = req.parent_id;
        category.image_url = req.image_url;
        category.is_active = req.is_active.unwrap_or(true);
        category.display_order = req.display_order.unwrap_or_default();
        self.categories.insert(&category).await.map_err(conflict_as(SLUG_TAKEN))?;
        tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    pub async fn update(&self, id: Uuid, req: UpdateCategoryRequest) -> Result<Category> {
        req.validate()?;
        let mut category = self.get(id).await?;
        if let Some(slug) = req.slug.as_deref() { category.slug = slug_of(Some(slug), &category.name)?; }
        if let Some(name) = req.name { category.name = name.trim().to_string(); }
        if let Some(description) = req.description { category.description = Some(description); }
        if let Some(parent_id) = req.parent_id {
            if parent_id == id {
                return Err(MarketError::Validation("parentId cannot reference the category itself".to_string()));
            }
            self.get(parent_id).await?;
            category.parent_id = Some(parent_id);
        }
        if let Some(image_url) = req.image_url { category.image_url = Some(image_url); }
        if let Some(is_active) = req.is_active { category.is_active = is_active; }
        if let Some(display_order) = req.display_order { category.display_order = display_order; }
        category.updated_at = chrono::Utc::now();
        self.categories.replace(&category).await.map_err(conflict_as(SLUG_TAKEN))?;
        Ok(category)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.categories.delete(id).await? {
            return Err(MarketError::NotFound("Category"));
        }
        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }
}
