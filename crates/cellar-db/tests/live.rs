//! Live integration tests for cellar-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, migrated Postgres database from the sqlx test
//! harness (`DATABASE_URL` must point at a server it can create databases on).

use cellar_core::{CatalogFields, CatalogStore, Lookup, StoreError, SupplierConfig, SupplierRegistry};
use cellar_db::{
    complete_sync_run, create_sync_run, fail_sync_run, get_sync_run, last_started_sync_run,
    seed_suppliers, skip_sync_run, start_sync_run, DbError, PgCatalog, TRIGGER_CLI,
    TRIGGER_SCHEDULER,
};
use rust_decimal::Decimal;
use serde_json::{json, Map};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn supplier_config(name: &str, base_url: &str) -> SupplierConfig {
    SupplierConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        notes: None,
    }
}

async fn seed_one_supplier(pool: &sqlx::PgPool) -> i64 {
    seed_suppliers(pool, &[supplier_config("Vinhos", "https://vinhos.test/api")])
        .await
        .expect("seed failed");
    sqlx::query_scalar::<_, i64>("SELECT id FROM suppliers WHERE base_url = $1")
        .bind("https://vinhos.test/api")
        .fetch_one(pool)
        .await
        .expect("supplier id")
}

fn fields(upc: &str, cents: i64, supplier_id: i64) -> CatalogFields {
    let mut attributes = Map::new();
    attributes.insert("name".to_string(), json!("Albariño"));
    CatalogFields {
        upc: upc.to_string(),
        price: Decimal::new(cents, 2),
        supplier_id,
        attributes,
    }
}

// ---------------------------------------------------------------------------
// Section 1: Sync run lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn sync_run_lifecycle_stores_report(pool: sqlx::PgPool) {
    let run = create_sync_run(&pool, TRIGGER_CLI).await.expect("create failed");
    assert_eq!(run.status, "queued");
    assert!(run.started_at.is_none());

    start_sync_run(&pool, run.id).await.expect("start failed");
    let report = json!({"created": 3, "failures": []});
    complete_sync_run(&pool, run.id, 3, 0, &report)
        .await
        .expect("complete failed");

    let fetched = get_sync_run(&pool, run.id).await.expect("get failed");
    assert_eq!(fetched.status, "succeeded");
    assert!(fetched.started_at.is_some());
    assert!(fetched.completed_at.is_some());
    assert_eq!(fetched.records_processed, 3);
    assert_eq!(fetched.report, Some(report));
}

#[sqlx::test(migrations = "../../migrations")]
async fn queued_run_can_be_failed_before_it_starts(pool: sqlx::PgPool) {
    let run = create_sync_run(&pool, TRIGGER_SCHEDULER)
        .await
        .expect("create failed");

    fail_sync_run(&pool, run.id, "guard query failed")
        .await
        .expect("failing a queued run should succeed");

    let fetched = get_sync_run(&pool, run.id).await.expect("get failed");
    assert_eq!(fetched.status, "failed");
    assert!(fetched.completed_at.is_some());
    assert_eq!(fetched.error_message.as_deref(), Some("guard query failed"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn finished_run_cannot_be_failed_again(pool: sqlx::PgPool) {
    let run = create_sync_run(&pool, TRIGGER_CLI).await.expect("create failed");
    skip_sync_run(&pool, run.id, "too soon").await.expect("skip failed");

    let err = fail_sync_run(&pool, run.id, "late failure")
        .await
        .expect_err("skipped run must not become failed");
    assert!(
        matches!(err, DbError::InvalidSyncRunTransition { .. }),
        "expected InvalidSyncRunTransition, got {err:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn skipped_run_cannot_start(pool: sqlx::PgPool) {
    let run = create_sync_run(&pool, TRIGGER_CLI).await.expect("create failed");
    skip_sync_run(&pool, run.id, "too soon").await.expect("skip failed");

    let err = start_sync_run(&pool, run.id)
        .await
        .expect_err("skipped run must not start");
    assert!(matches!(err, DbError::InvalidSyncRunTransition { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn last_started_ignores_current_and_unstarted_runs(pool: sqlx::PgPool) {
    let started = create_sync_run(&pool, TRIGGER_CLI).await.expect("create failed");
    start_sync_run(&pool, started.id).await.expect("start failed");
    let skipped = create_sync_run(&pool, TRIGGER_CLI).await.expect("create failed");
    skip_sync_run(&pool, skipped.id, "too soon").await.expect("skip failed");
    let current = create_sync_run(&pool, TRIGGER_CLI).await.expect("create failed");

    let last = last_started_sync_run(&pool, current.id)
        .await
        .expect("query failed")
        .expect("one started run");
    assert_eq!(last.id, started.id);

    let none = last_started_sync_run(&pool, started.id)
        .await
        .expect("query failed");
    assert!(none.is_none());
}

// ---------------------------------------------------------------------------
// Section 2: Supplier registry
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seeding_twice_keeps_one_row_per_base_url(pool: sqlx::PgPool) {
    let suppliers = [
        supplier_config("Vinhos", "https://vinhos.test/api"),
        supplier_config("Bodega", "https://bodega.test/"),
    ];
    seed_suppliers(&pool, &suppliers).await.expect("seed failed");
    seed_suppliers(&pool, &suppliers).await.expect("reseed failed");

    let listed = PgCatalog::new(pool.clone())
        .list_suppliers()
        .await
        .expect("list failed");
    let names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Vinhos", "Bodega"]);
}

// ---------------------------------------------------------------------------
// Section 3: Catalog store
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn catalog_create_lookup_update(pool: sqlx::PgPool) {
    let supplier_id = seed_one_supplier(&pool).await;
    let catalog = PgCatalog::new(pool.clone());

    assert!(matches!(
        catalog.lookup("111").await.expect("lookup failed"),
        Lookup::NotFound
    ));

    let created = catalog
        .create(&fields("111", 999, supplier_id))
        .await
        .expect("create failed");
    let Lookup::Found(found) = catalog.lookup("111").await.expect("lookup failed") else {
        panic!("record 111 should exist after create");
    };
    assert_eq!(found.id, created.id);
    assert_eq!(found.fields, fields("111", 999, supplier_id));

    let updated = catalog
        .update(created.id, &fields("111", 750, supplier_id))
        .await
        .expect("update failed");
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.fields.price, Decimal::new(750, 2));
    assert_eq!(updated.fields.attributes["name"], json!("Albariño"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn catalog_create_reports_duplicate_upc(pool: sqlx::PgPool) {
    let supplier_id = seed_one_supplier(&pool).await;
    let catalog = PgCatalog::new(pool.clone());
    catalog
        .create(&fields("111", 999, supplier_id))
        .await
        .expect("create failed");

    let err = catalog
        .create(&fields("111", 500, supplier_id))
        .await
        .expect_err("second create must conflict");
    assert!(
        matches!(err, StoreError::DuplicateKey { ref upc } if upc == "111"),
        "got {err:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn catalog_update_of_missing_id_is_reported(pool: sqlx::PgPool) {
    let supplier_id = seed_one_supplier(&pool).await;
    let catalog = PgCatalog::new(pool.clone());

    let err = catalog
        .update(4242, &fields("111", 999, supplier_id))
        .await
        .expect_err("no such record");
    assert!(matches!(err, StoreError::MissingRecord { id: 4242 }), "got {err:?}");
}
