//! Document store abstraction.
//!
//! Every entity is persisted as a JSON document in a named collection. The
//! [`DocumentStore`] trait is the only seam between the services and the
//! storage backend: [`memory::InMemoryStore`] for tests and local runs,
//! [`postgres::PgDocumentStore`] for production (one `jsonb` table).
//!
//! Filters are equality predicates on top-level document fields plus an
//! optional case-insensitive text search. Equality is exact: the stored JSON
//! value must equal the filter value, with no case folding.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgDocumentStore;

use crate::config::AppConfig;

/// Open the backend selected by configuration. Postgres runs its migrations
/// on connect.
pub async fn open(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match &config.database {
        Some(db) => {
            let store = PgDocumentStore::connect(&db.url, db.max_connections).await?;
            tracing::info!("connected to postgres document store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// Collections
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Sessions,
    SellerApplications,
    Products,
    Categories,
    Orders,
    Reviews,
    Addresses,
    PaymentMethods,
    CheckoutKeys,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Sessions => "sessions",
            Self::SellerApplications => "seller_applications",
            Self::Products => "products",
            Self::Categories => "categories",
            Self::Orders => "orders",
            Self::Reviews => "reviews",
            Self::Addresses => "addresses",
            Self::PaymentMethods => "payment_methods",
            Self::CheckoutKeys => "checkout_keys",
        }
    }

    /// Fields whose values must be unique within the collection.
    ///
    /// Must stay in sync with the `uq_*` indexes in `migrations/`.
    pub const fn unique_fields(self) -> &'static [&'static str] {
        match self {
            Self::Users => &["email"],
            Self::Sessions => &["token"],
            Self::Products | Self::Categories => &["slug"],
            Self::CheckoutKeys => &["scopedKey"],
            Self::SellerApplications
            | Self::Orders
            | Self::Reviews
            | Self::Addresses
            | Self::PaymentMethods => &[],
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique field `{field}` in {collection}")]
    Conflict {
        collection: &'static str,
        field: &'static str,
    },

    #[error("document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// Field value equals the given JSON value exactly.
    Eq(String, Value),
    /// Field is an array containing the given value.
    Contains(String, Value),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Search {
    pub fields: Vec<&'static str>,
    pub text: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
    search: Option<Search>,
}

fn to_json(value: impl Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Serialize) -> Self {
        self.conditions.push(Condition::Eq(field.to_string(), to_json(value)));
        self
    }

    pub fn eq_opt<T: Serialize>(self, field: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn contains(mut self, field: &str, value: impl Serialize) -> Self {
        self.conditions.push(Condition::Contains(field.to_string(), to_json(value)));
        self
    }

    /// Case-insensitive substring match over `fields`. Blank text is ignored.
    pub fn search(mut self, fields: &[&'static str], text: Option<&str>) -> Self {
        if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
            self.search = Some(Search {
                fields: fields.to_vec(),
                text: text.to_string(),
            });
        }
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn search_terms(&self) -> Option<&Search> {
        self.search.as_ref()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        let conditions = self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => doc.get(field) == Some(value),
            Condition::Contains(field, value) => doc
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        });
        let search = self.search.as_ref().map_or(true, |search| {
            let needle = search.text.to_lowercase();
            search.fields.iter().any(|field| {
                doc.get(*field)
                    .and_then(Value::as_str)
                    .is_some_and(|hay| hay.to_lowercase().contains(&needle))
            })
        });
        conditions && search
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), direction: SortDirection::Desc }
    }

    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), direction: SortDirection::Asc }
    }

    pub fn newest_first() -> Self {
        Self::desc("createdAt")
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindOptions {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn filtered(filter: Filter) -> Self {
        Self { filter, ..Self::default() }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Ordering used by backends without native JSON ordering: missing values
/// first, numbers numerically, RFC 3339 timestamps chronologically.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

pub(crate) fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Pagination
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub total_results: u64,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, request: PageRequest, total_results: u64) -> Self {
        Self {
            results,
            page: request.page,
            limit: request.limit,
            total_pages: total_results.div_ceil(u64::from(request.limit)),
            total_results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
            total_results: self.total_results,
        }
    }
}

// =============================================================================
// Store trait
// =============================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert a new document. Fails with [`StoreError::Conflict`] when a
    /// unique field collides with an existing document.
    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError>;

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError>;

    /// Replace an existing document. Returns `false` when `id` is absent.
    async fn replace(&self, collection: Collection, id: Uuid, doc: Value) -> Result<bool, StoreError>;

    /// Delete a document. Returns `false` when `id` is absent.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError>;

    async fn find(&self, collection: Collection, options: &FindOptions) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;

    /// Sum a numeric field over matching documents. Non-numeric values count as zero.
    async fn sum(&self, collection: Collection, field: &str, filter: &Filter) -> Result<Decimal, StoreError>;
}

/// A type stored as a document in a fixed collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
}

/// Typed view of one collection.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), _marker: PhantomData }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store, _marker: PhantomData }
    }

    pub async fn insert(&self, doc: &T) -> Result<(), StoreError> {
        self.store.insert(T::COLLECTION, doc.id(), serde_json::to_value(doc)?).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn replace(&self, doc: &T) -> Result<bool, StoreError> {
        self.store.replace(T::COLLECTION, doc.id(), serde_json::to_value(doc)?).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn find(&self, options: &FindOptions) -> Result<Vec<T>, StoreError> {
        self.store
            .find(T::COLLECTION, options)
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }

    pub async fn find_one(&self, filter: Filter) -> Result<Option<T>, StoreError> {
        let mut found = self.find(&FindOptions::filtered(filter).limit(1)).await?;
        Ok(found.pop())
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.store.count(T::COLLECTION, filter).await
    }

    pub async fn sum(&self, field: &str, filter: &Filter) -> Result<Decimal, StoreError> {
        self.store.sum(T::COLLECTION, field, filter).await
    }

    /// Count and fetch one page concurrently.
    pub async fn page(&self, filter: Filter, sort: Sort, request: PageRequest) -> Result<Page<T>, StoreError> {
        let options = FindOptions {
            filter,
            sort: Some(sort),
            skip: request.skip(),
            limit: Some(u64::from(request.limit)),
        };
        let (total, results) = tokio::try_join!(self.count(&options.filter), self.find(&options))?;
        Ok(Page::new(results, request, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_is_exact_and_case_sensitive() {
        let filter = Filter::new().eq("status", "completed");
        assert!(filter.matches(&json!({"status": "completed"})));
        assert!(!filter.matches(&json!({"status": "Completed"})));
        assert!(!filter.matches(&json!({"status": "delivered"})));
        assert!(!filter.matches(&json!({})));
    }

    #[test]
    fn test_filter_contains_and_search() {
        let filter = Filter::new()
            .contains("sellerIds", "s1")
            .search(&["name", "description"], Some("LACE"));
        assert!(filter.matches(&json!({"sellerIds": ["s1", "s2"], "name": "Blonde lace front"})));
        assert!(!filter.matches(&json!({"sellerIds": ["s2"], "name": "Blonde lace front"})));
        assert!(!filter.matches(&json!({"sellerIds": ["s1"], "name": "Curly bob"})));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        assert!(Filter::new().search(&["name"], Some("   ")).search_terms().is_none());
    }

    #[test]
    fn test_page_request_bounds() {
        assert_eq!(PageRequest::new(Some(0), Some(500)), PageRequest { page: 1, limit: MAX_PAGE_SIZE });
        assert_eq!(PageRequest::new(Some(3), Some(20)).skip(), 40);
        let page: Page<u8> = Page::new(vec![], PageRequest::new(Some(1), Some(10)), 21);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_compare_values_orders_timestamps_chronologically() {
        let earlier = json!("2025-01-01T00:00:00Z");
        let later = json!("2025-01-01T00:00:00.5Z");
        assert_eq!(compare_values(Some(&earlier), Some(&later)), Ordering::Less);
        assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
    }
}
