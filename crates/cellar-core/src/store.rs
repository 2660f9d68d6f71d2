//! Storage seams consumed by the sync pipeline.
//!
//! The catalog is modelled as a keyed store with lookup/create/update only;
//! the Postgres implementation lives in `cellar-db`.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::offers::{CatalogFields, CatalogRecord, Supplier};

/// Result of looking a UPC up in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(CatalogRecord),
    NotFound,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("catalog record {id} no longer exists")]
    MissingRecord { id: i64 },

    #[error("catalog already holds a record for upc {upc}")]
    DuplicateKey { upc: String },

    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Keyed catalog store. Implementations provide single-record atomicity only.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up the record for `upc`.
    async fn lookup(&self, upc: &str) -> Result<Lookup, StoreError>;

    /// Inserts a new record.
    async fn create(&self, fields: &CatalogFields) -> Result<CatalogRecord, StoreError>;

    /// Overwrites every field of record `id` with `fields`.
    async fn update(&self, id: i64, fields: &CatalogFields) -> Result<CatalogRecord, StoreError>;
}

/// Source of the suppliers polled on each run.
#[async_trait]
pub trait SupplierRegistry: Send + Sync {
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError>;
}

#[async_trait]
impl SupplierRegistry for [Supplier] {
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        Ok(self.to_vec())
    }
}

#[async_trait]
impl SupplierRegistry for Vec<Supplier> {
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        self.as_slice().list_suppliers().await
    }
}

#[async_trait]
impl<T: CatalogStore + ?Sized> CatalogStore for Arc<T> {
    async fn lookup(&self, upc: &str) -> Result<Lookup, StoreError> {
        (**self).lookup(upc).await
    }

    async fn create(&self, fields: &CatalogFields) -> Result<CatalogRecord, StoreError> {
        (**self).create(fields).await
    }

    async fn update(&self, id: i64, fields: &CatalogFields) -> Result<CatalogRecord, StoreError> {
        (**self).update(id, fields).await
    }
}

#[async_trait]
impl<T: SupplierRegistry + ?Sized> SupplierRegistry for Arc<T> {
    async fn list_suppliers(&self) -> Result<Vec<Supplier>, StoreError> {
        (**self).list_suppliers().await
    }
}
