//! Shared fixtures for cellar-sync integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cellar_core::{
    CatalogFields, CatalogRecord, CatalogStore, ImagePolicy, Lookup, StoreError, Supplier,
};
use cellar_feed::FeedClient;
use cellar_sync::{ImageSink, Reconciler, SyncOrchestrator, SyncSettings};
use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 1x1 transparent PNG.
pub const PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

pub fn png_data_uri() -> String {
    format!("data:image/png;base64,{PNG_BASE64}")
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, CatalogRecord>,
    next_id: i64,
    writes: usize,
    failing: HashSet<String>,
}

/// In-memory [`CatalogStore`] that counts writes and can be told to fail
/// writes for particular UPCs.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: Mutex<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes_for(&self, upc: &str) {
        self.inner.lock().unwrap().failing.insert(upc.to_string());
    }

    /// Inserts a record directly, bypassing the write counter.
    pub fn seed(&self, fields: CatalogFields) -> CatalogRecord {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let now = Utc::now();
        let record = CatalogRecord {
            id: inner.next_id,
            fields,
            created_at: now,
            updated_at: now,
        };
        inner.records.insert(record.fields.upc.clone(), record.clone());
        record
    }

    pub fn get(&self, upc: &str) -> Option<CatalogRecord> {
        self.inner.lock().unwrap().records.get(upc).cloned()
    }

    /// Every record, ordered by UPC.
    pub fn records(&self) -> Vec<CatalogRecord> {
        self.inner.lock().unwrap().records.values().cloned().collect()
    }

    pub fn writes(&self) -> usize {
        self.inner.lock().unwrap().writes
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn lookup(&self, upc: &str) -> Result<Lookup, StoreError> {
        Ok(match self.get(upc) {
            Some(record) => Lookup::Found(record),
            None => Lookup::NotFound,
        })
    }

    async fn create(&self, fields: &CatalogFields) -> Result<CatalogRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing.contains(&fields.upc) {
            return Err(StoreError::Backend("simulated write failure".into()));
        }
        if inner.records.contains_key(&fields.upc) {
            return Err(StoreError::DuplicateKey {
                upc: fields.upc.clone(),
            });
        }
        inner.next_id += 1;
        inner.writes += 1;
        let now = Utc::now();
        let record = CatalogRecord {
            id: inner.next_id,
            fields: fields.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.records.insert(fields.upc.clone(), record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, fields: &CatalogFields) -> Result<CatalogRecord, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing.contains(&fields.upc) {
            return Err(StoreError::Backend("simulated write failure".into()));
        }
        let existing_upc = inner
            .records
            .values()
            .find(|r| r.id == id)
            .map(|r| r.fields.upc.clone())
            .ok_or(StoreError::MissingRecord { id })?;
        let mut record = inner
            .records
            .remove(&existing_upc)
            .ok_or(StoreError::MissingRecord { id })?;
        record.fields = fields.clone();
        record.updated_at = Utc::now();
        inner.writes += 1;
        inner.records.insert(fields.upc.clone(), record.clone());
        Ok(record)
    }
}

pub fn supplier(id: i64, base_url: &str) -> Supplier {
    Supplier {
        id,
        name: format!("supplier-{id}"),
        base_url: base_url.to_string(),
    }
}

/// Starts a supplier answering `GET /wines` with `entries`.
pub async fn supplier_server(entries: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wines"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "wines": entries } })),
        )
        .mount(&server)
        .await;
    server
}

/// 1-second request timeout so unreachable-supplier tests stay fast.
pub fn feed_client() -> FeedClient {
    FeedClient::new(1, "cellar-test/0.1", 0, 0).expect("failed to build test FeedClient")
}

pub fn orchestrator(
    suppliers: Vec<Supplier>,
    catalog: &Arc<MemoryCatalog>,
    blob_root: &Path,
    policy: ImagePolicy,
) -> SyncOrchestrator<Vec<Supplier>, Arc<MemoryCatalog>> {
    let reconciler = Reconciler::new(Arc::clone(catalog), ImageSink::new(blob_root), policy);
    SyncOrchestrator::new(
        suppliers,
        feed_client(),
        reconciler,
        SyncSettings::default(),
    )
}
