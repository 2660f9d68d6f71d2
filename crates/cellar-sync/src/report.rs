//! Per-run summary of a sync.

use serde::{Deserialize, Serialize};

/// Failure categories surfaced in a [`SyncReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SupplierUnreachable,
    SupplierBadResponse,
    MalformedOfferRecord,
    UnsupportedImageType,
    InvalidImagePayload,
    ImageWriteFailure,
    CatalogWriteFailure,
}

/// The smallest unit a failure applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureScope {
    Supplier { id: i64 },
    Offer { supplier_id: i64, index: usize },
    Product { upc: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub kind: FailureKind,
    pub scope: FailureScope,
    pub reason: String,
}

/// Counts and failures from one sync run.
///
/// `created + updated + unchanged` plus the products that failed outright
/// equals `products_considered`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub suppliers_total: usize,
    pub suppliers_succeeded: usize,
    /// Valid offers across every reachable supplier, before aggregation.
    pub offers_fetched: usize,
    /// Distinct UPCs after aggregation.
    pub products_considered: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub images_written: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    /// Catalog records written (created or updated) by the run.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.created + self.updated
    }

    /// Number of failures of `kind`.
    #[must_use]
    pub fn count(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }

    pub(crate) fn push(&mut self, kind: FailureKind, scope: FailureScope, reason: impl Into<String>) {
        self.failures.push(SyncFailure {
            kind,
            scope,
            reason: reason.into(),
        });
    }
}
