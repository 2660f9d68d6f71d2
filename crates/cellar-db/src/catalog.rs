//! Postgres-backed [`CatalogStore`] over the `wines` table.

use async_trait::async_trait;
use cellar_core::{
    CatalogFields, CatalogRecord, CatalogStore, Lookup, StoreError, Supplier, SupplierRegistry,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::suppliers::list_active_suppliers;
use crate::DbError;

const WINE_COLUMNS: &str = "id, upc, price, supplier_id, attributes, created_at, updated_at";

/// A row from the `wines` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WineRow {
    pub id: i64,
    pub upc: String,
    pub price: Decimal,
    pub supplier_id: i64,
    /// Always a JSON object when written through [`PgCatalog`].
    pub attributes: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WineRow> for CatalogRecord {
    fn from(row: WineRow) -> Self {
        let attributes = match row.attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: row.id,
            fields: CatalogFields {
                upc: row.upc,
                price: row.price,
                supplier_id: row.supplier_id,
                attributes,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Maps a write error, turning a `wines.upc` unique violation into
/// [`StoreError::DuplicateKey`].
fn write_error(err: sqlx::Error, upc: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateKey {
            upc: upc.to_string(),
        },
        _ => DbError::from(err).into(),
    }
}

/// Catalog and supplier registry backed by one Postgres pool.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn lookup(&self, upc: &str) -> Result<Lookup, StoreError> {
        let row = sqlx::query_as::<_, WineRow>(&format!(
            "SELECT {WINE_COLUMNS} FROM wines WHERE upc = $1"
        ))
        .bind(upc)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(match row {
            Some(row) => Lookup::Found(row.into()),
            None => Lookup::NotFound,
        })
    }

    async fn create(&self, fields: &CatalogFields) -> Result<CatalogRecord, StoreError> {
        let row = sqlx::query_as::<_, WineRow>(&format!(
            "INSERT INTO wines (upc, price, supplier_id, attributes) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {WINE_COLUMNS}"
        ))
        .bind(&fields.upc)
        .bind(fields.price)
        .bind(fields.supplier_id)
        .bind(Json(&fields.attributes))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, &fields.upc))?;

        Ok(row.into())
    }

    async fn update(&self, id: i64, fields: &CatalogFields) -> Result<CatalogRecord, StoreError> {
        let row = sqlx::query_as::<_, WineRow>(&format!(
            "UPDATE wines \
             SET upc = $2, price = $3, supplier_id = $4, attributes = $5, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {WINE_COLUMNS}"
        ))
        .bind(id)
        .bind(&fields.upc)
        .bind(fields.price)
        .bind(fields.supplier_id)
        .bind(Json(&fields.attributes))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, &fields.upc))?
        .ok_or(StoreError::MissingRecord { id })?;

        Ok(row.into())
    }
}

#[async_trait]
impl SupplierRegistry for PgCatalog {
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        let rows = list_active_suppliers(&self.pool).await?;
        Ok(rows.into_iter().map(Supplier::from).collect())
    }
}
