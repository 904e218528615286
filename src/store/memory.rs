//! In-memory document store.
//!
//! Same semantics as the Postgres backend: unique fields, exact equality
//! filters, insertion order when no sort is given.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{compare_values, decimal_of, Collection, DocumentStore, Filter, FindOptions, SortDirection, StoreError};

type Rows = Vec<(Uuid, Value)>;

#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, Rows>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(collection: Collection, rows: &Rows, id: Uuid, doc: &Value) -> Result<(), StoreError> {
    for field in collection.unique_fields() {
        let Some(value) = doc.get(*field).filter(|v| !v.is_null()) else { continue };
        if rows.iter().any(|(other, existing)| *other != id && existing.get(*field) == Some(value)) {
            return Err(StoreError::Conflict { collection: collection.name(), field: *field });
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let rows = collections.entry(collection).or_default();
        if rows.iter().any(|(existing, _)| *existing == id) {
            return Err(StoreError::Conflict { collection: collection.name(), field: "id" });
        }
        check_unique(collection, rows, id, &doc)?;
        rows.push((id, doc));
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|rows| rows.iter().find(|(existing, _)| *existing == id))
            .map(|(_, doc)| doc.clone()))
    }

    async fn replace(&self, collection: Collection, id: Uuid, doc: Value) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(&collection) else { return Ok(false) };
        check_unique(collection, rows, id, &doc)?;
        match rows.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => {
                *slot = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(rows) = collections.get_mut(&collection) else { return Ok(false) };
        let before = rows.len();
        rows.retain(|(existing, _)| *existing != id);
        Ok(rows.len() != before)
    }

    async fn find(&self, collection: Collection, options: &FindOptions) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        let Some(rows) = collections.get(&collection) else { return Ok(vec![]) };
        let mut matched: Vec<&Value> = rows
            .iter()
            .map(|(_, doc)| doc)
            .filter(|doc| options.filter.matches(doc))
            .collect();
        if let Some(sort) = &options.sort {
            matched.sort_by(|a, b| {
                let ordering = compare_values(a.get(&sort.field), b.get(&sort.field));
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(matched.into_iter().skip(skip).take(limit).cloned().collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(&collection)
            .map_or(0, |rows| rows.iter().filter(|(_, doc)| filter.matches(doc)).count());
        Ok(count as u64)
    }

    async fn sum(&self, collection: Collection, field: &str, filter: &Filter) -> Result<Decimal, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).map_or(Decimal::ZERO, |rows| {
            rows.iter()
                .filter(|(_, doc)| filter.matches(doc))
                .filter_map(|(_, doc)| doc.get(field).and_then(decimal_of))
                .sum()
        }))
    }
}
