//! Postgres-backed document store.
//!
//! All collections share the `documents` table created by
//! `migrations/20250101000000_documents.sql`. Unique fields are enforced by
//! partial expression indexes named `uq_<collection>_<field>`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Collection, Condition, DocumentStore, Filter, FindOptions, SortDirection, StoreError};

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run the embedded migrations.
    pub async fn connect(database_url: &SecretString, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url.expose_secret())
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.into()))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_write_error(collection: Collection, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or_default().to_ascii_lowercase();
            let field = collection
                .unique_fields()
                .iter()
                .find(|field| constraint == format!("uq_{}_{}", collection.name(), field.to_ascii_lowercase()))
                .copied()
                .unwrap_or("id");
            return StoreError::Conflict { collection: collection.name(), field };
        }
    }
    StoreError::Database(err)
}

fn created_at_of(doc: &Value) -> DateTime<Utc> {
    doc.get("createdAt")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(Utc::now)
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, collection: Collection, filter: &Filter) {
    qb.push(" WHERE collection = ");
    qb.push_bind(collection.name());
    for condition in filter.conditions() {
        match condition {
            Condition::Eq(field, value) => {
                qb.push(" AND body -> ");
                qb.push_bind(field.clone());
                qb.push(" = ");
                qb.push_bind(Json(value.clone()));
            }
            Condition::Contains(field, value) => {
                qb.push(" AND body -> ");
                qb.push_bind(field.clone());
                qb.push(" @> ");
                qb.push_bind(Json(Value::Array(vec![value.clone()])));
            }
        }
    }
    if let Some(search) = filter.search_terms() {
        let pattern = format!(
            "%{}%",
            search.text.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );
        qb.push(" AND (");
        for (i, field) in search.fields.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("body ->> ");
            qb.push_bind(*field);
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError> {
        let created_at = created_at_of(&doc);
        sqlx::query("INSERT INTO documents (collection, id, body, created_at) VALUES ($1, $2, $3, $4)")
            .bind(collection.name())
            .bind(id)
            .bind(Json(doc))
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(collection, e))?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Value>>("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(body)| body))
    }

    async fn replace(&self, collection: Collection, id: Uuid, doc: Value) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .bind(Json(doc))
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(collection, e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, collection: Collection, options: &FindOptions) -> Result<Vec<Value>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents");
        push_where(&mut qb, collection, &options.filter);
        match &options.sort {
            Some(sort) => {
                if sort.field == "createdAt" {
                    qb.push(" ORDER BY created_at");
                } else {
                    qb.push(" ORDER BY body -> ");
                    qb.push_bind(sort.field.clone());
                }
                qb.push(match sort.direction {
                    SortDirection::Asc => " ASC NULLS FIRST",
                    SortDirection::Desc => " DESC NULLS LAST",
                });
                qb.push(", id");
            }
            None => {
                qb.push(" ORDER BY created_at, id");
            }
        }
        if let Some(limit) = options.limit {
            qb.push(" LIMIT ");
            qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if options.skip > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(i64::try_from(options.skip).unwrap_or(i64::MAX));
        }
        let rows = qb.build_query_scalar::<Json<Value>>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|Json(body)| body).collect())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents");
        push_where(&mut qb, collection, filter);
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn sum(&self, collection: Collection, field: &str, filter: &Filter) -> Result<Decimal, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COALESCE(SUM(CASE WHEN jsonb_typeof(body -> ",
        );
        qb.push_bind(field.to_string());
        qb.push(") = 'number' THEN (body ->> ");
        qb.push_bind(field.to_string());
        qb.push(")::numeric ELSE 0 END), 0) FROM documents");
        push_where(&mut qb, collection, filter);
        let sum = qb.build_query_scalar::<Decimal>().fetch_one(&self.pool).await?;
        Ok(sum)
    }
}
