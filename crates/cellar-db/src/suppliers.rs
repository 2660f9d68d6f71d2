//! Database operations for the `suppliers` registry table.

use cellar_core::{Supplier, SupplierConfig};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `suppliers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierRow {
    pub id: i64,
    pub name: String,
    pub base_url: String,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            base_url: row.base_url,
        }
    }
}

/// Upsert suppliers from config into the database, keyed by `base_url`.
///
/// Returns the number of suppliers processed (inserted or updated).
/// All upserts run inside a single transaction; if any operation fails
/// the entire batch is rolled back. Suppliers already in the table but
/// absent from `suppliers` are left untouched.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_suppliers(pool: &PgPool, suppliers: &[SupplierConfig]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for supplier in suppliers {
        sqlx::query(
            "INSERT INTO suppliers (name, base_url, notes, is_active) \
             VALUES ($1, $2, $3, true) \
             ON CONFLICT (base_url) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 notes = EXCLUDED.notes, \
                 is_active = true, \
                 updated_at = NOW()",
        )
        .bind(supplier.name.trim())
        .bind(supplier.base_url.trim())
        .bind(&supplier.notes)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}

/// Returns every active supplier, ordered by `id`.
///
/// The ordering is the supplier enumeration order used for tie-breaking
/// equal prices, so it must stay stable between runs.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_suppliers(pool: &PgPool) -> Result<Vec<SupplierRow>, DbError> {
    let rows = sqlx::query_as::<_, SupplierRow>(
        "SELECT id, name, base_url, notes, is_active, created_at, updated_at \
         FROM suppliers \
         WHERE is_active = true \
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_row_converts_to_supplier() {
        let now = Utc::now();
        let row = SupplierRow {
            id: 3,
            name: "Bravo Cellars".to_string(),
            base_url: "https://bravo.example/api/".to_string(),
            notes: Some("weekly price list".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let supplier = Supplier::from(row);
        assert_eq!(supplier.id, 3);
        assert_eq!(supplier.name, "Bravo Cellars");
        assert_eq!(supplier.base_url, "https://bravo.example/api/");
    }
}
