//! One sync run: fetch every supplier, keep the cheapest offer per UPC,
//! reconcile each winner into the catalog.

use cellar_core::{reduce, CatalogStore, Supplier, SupplierRegistry, WinningOfferMap};
use cellar_feed::{FeedBatch, FeedClient, FeedFailure, MalformedOffer};
use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::image::ImageOutcome;
use crate::reconcile::{CatalogAction, Reconciler};
use crate::report::{FailureKind, FailureScope, SyncFailure, SyncReport};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no suppliers configured")]
    NoSuppliers,

    #[error("failed to read supplier registry: {0}")]
    Registry(#[source] cellar_core::StoreError),

    #[error("all {} suppliers failed", .failures.len())]
    NoReachableSuppliers { failures: Vec<SyncFailure> },
}

/// Concurrency limits for a run.
#[derive(Debug, Clone, Copy)]
pub struct SyncSettings {
    /// `0` fetches every supplier at once.
    pub max_concurrent_suppliers: usize,
    pub reconcile_max_concurrent: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_concurrent_suppliers: 0,
            reconcile_max_concurrent: 4,
        }
    }
}

/// Fetch and aggregation results without any writes.
#[derive(Debug)]
pub struct SyncPreview {
    pub winners: WinningOfferMap,
    /// Supplier and offer counts plus fetch-stage failures. Catalog counters
    /// are always zero.
    pub report: SyncReport,
}

pub struct SyncOrchestrator<R, S> {
    registry: R,
    feed: FeedClient,
    reconciler: Reconciler<S>,
    settings: SyncSettings,
}

impl<R, S> SyncOrchestrator<R, S>
where
    R: SupplierRegistry,
    S: CatalogStore,
{
    #[must_use]
    pub fn new(
        registry: R,
        feed: FeedClient,
        reconciler: Reconciler<S>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            registry,
            feed,
            reconciler,
            settings,
        }
    }

    /// Fetches and aggregates without touching the catalog or image store.
    ///
    /// # Errors
    ///
    /// Same fatal conditions as [`Self::run_sync`].
    pub async fn preview(&self) -> Result<SyncPreview, SyncError> {
        let suppliers = self.load_suppliers().await?;
        let batch = self
            .feed
            .fetch_all(&suppliers, self.settings.max_concurrent_suppliers)
            .await;
        let (winners, report) = aggregate(suppliers.len(), batch)?;
        Ok(SyncPreview { winners, report })
    }

    /// Runs one full sync.
    ///
    /// Supplier, offer, image, and catalog failures are recorded in the
    /// returned report and never abort the run.
    ///
    /// # Errors
    ///
    /// - [`SyncError::NoSuppliers`]: the registry is empty.
    /// - [`SyncError::Registry`]: the registry could not be read.
    /// - [`SyncError::NoReachableSuppliers`]: every supplier failed.
    pub async fn run_sync(&self) -> Result<SyncReport, SyncError> {
        let SyncPreview {
            winners,
            mut report,
        } = self.preview().await?;

        tracing::info!(
            suppliers = report.suppliers_succeeded,
            offers = report.offers_fetched,
            products = report.products_considered,
            "reconciling winning offers"
        );

        let reconciler = &self.reconciler;
        let results: Vec<_> = stream::iter(winners.into_offers())
            .map(|offer| reconciler.reconcile(offer))
            .buffer_unordered(self.settings.reconcile_max_concurrent.max(1))
            .collect()
            .await;

        for result in results {
            match result {
                Ok(reconciled) => {
                    match reconciled.action {
                        CatalogAction::Created => report.created += 1,
                        CatalogAction::Updated => report.updated += 1,
                        CatalogAction::Unchanged => report.unchanged += 1,
                    }
                    match reconciled.image {
                        Ok(ImageOutcome::Written(_)) => report.images_written += 1,
                        Ok(ImageOutcome::Absent | ImageOutcome::Unchanged(_)) => {}
                        Err(err) => report.push(
                            err.kind(),
                            FailureScope::Product {
                                upc: reconciled.record.fields.upc,
                            },
                            err.to_string(),
                        ),
                    }
                }
                Err(err) => {
                    tracing::error!(upc = err.upc(), error = %err, "failed to reconcile offer");
                    if let Some(image_err) = err.image_failure() {
                        report.push(
                            image_err.kind(),
                            FailureScope::Product {
                                upc: err.upc().to_string(),
                            },
                            image_err.to_string(),
                        );
                    }
                    report.push(
                        err.kind(),
                        FailureScope::Product {
                            upc: err.upc().to_string(),
                        },
                        err.to_string(),
                    );
                }
            }
        }

        tracing::info!(
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            images_written = report.images_written,
            failures = report.failures.len(),
            "sync complete"
        );

        Ok(report)
    }

    async fn load_suppliers(&self) -> Result<Vec<Supplier>, SyncError> {
        let suppliers = self
            .registry
            .list_suppliers()
            .await
            .map_err(SyncError::Registry)?;
        if suppliers.is_empty() {
            return Err(SyncError::NoSuppliers);
        }
        Ok(suppliers)
    }
}

/// Folds a fetch batch into the winning-offer map and a report carrying
/// every fetch-stage failure.
fn aggregate(
    suppliers_total: usize,
    batch: FeedBatch,
) -> Result<(WinningOfferMap, SyncReport), SyncError> {
    let suppliers_succeeded = batch.feeds.len();
    let (offers, rejected, failures) = batch.into_parts();

    let mut report = SyncReport {
        suppliers_total,
        suppliers_succeeded,
        offers_fetched: offers.len(),
        ..SyncReport::default()
    };
    report.failures.extend(failures.iter().map(supplier_failure));

    if suppliers_succeeded == 0 {
        return Err(SyncError::NoReachableSuppliers {
            failures: report.failures,
        });
    }

    report.failures.extend(rejected.into_iter().map(offer_failure));

    let winners = reduce(offers);
    report.products_considered = winners.len();
    Ok((winners, report))
}

fn supplier_failure(failure: &FeedFailure) -> SyncFailure {
    let kind = if failure.error.is_unreachable() {
        FailureKind::SupplierUnreachable
    } else {
        FailureKind::SupplierBadResponse
    };
    SyncFailure {
        kind,
        scope: FailureScope::Supplier {
            id: failure.supplier_id,
        },
        reason: failure.error.to_string(),
    }
}

fn offer_failure(rejected: MalformedOffer) -> SyncFailure {
    SyncFailure {
        kind: FailureKind::MalformedOfferRecord,
        scope: FailureScope::Offer {
            supplier_id: rejected.supplier_id,
            index: rejected.index,
        },
        reason: rejected.reason,
    }
}

#[cfg(test)]
mod tests {
    use cellar_core::RawOffer;
    use cellar_feed::{FeedError, SupplierFeed};
    use serde_json::Map;

    use super::*;

    fn offer(upc: &str, price: &str, supplier_id: i64) -> RawOffer {
        RawOffer {
            upc: upc.to_string(),
            price: price.parse().unwrap(),
            image: None,
            supplier_id,
            attributes: Map::new(),
        }
    }

    fn bad_status(supplier_id: i64) -> FeedFailure {
        FeedFailure {
            supplier_id,
            supplier_name: format!("supplier-{supplier_id}"),
            error: FeedError::UnexpectedStatus {
                status: 500,
                url: "http://supplier.test/wines".to_string(),
            },
        }
    }

    #[test]
    fn aggregate_reports_fetch_stage_failures() {
        let batch = FeedBatch {
            feeds: vec![SupplierFeed {
                supplier_id: 2,
                offers: vec![offer("111", "7.50", 2), offer("222", "3", 2)],
                rejected: vec![MalformedOffer {
                    supplier_id: 2,
                    index: 2,
                    reason: "missing upc".to_string(),
                }],
            }],
            failures: vec![bad_status(1)],
        };

        let (winners, report) = aggregate(2, batch).unwrap();

        assert_eq!(winners.len(), 2);
        assert_eq!(report.suppliers_total, 2);
        assert_eq!(report.suppliers_succeeded, 1);
        assert_eq!(report.offers_fetched, 2);
        assert_eq!(report.products_considered, 2);
        assert_eq!(report.count(FailureKind::SupplierBadResponse), 1);
        assert_eq!(
            report.failures[1].scope,
            FailureScope::Offer {
                supplier_id: 2,
                index: 2
            }
        );
    }

    #[test]
    fn aggregate_fails_when_no_supplier_succeeded() {
        let batch = FeedBatch {
            feeds: Vec::new(),
            failures: vec![bad_status(1), bad_status(2)],
        };

        let err = aggregate(2, batch).unwrap_err();

        match err {
            SyncError::NoReachableSuppliers { failures } => {
                assert_eq!(failures.len(), 2);
                assert!(failures
                    .iter()
                    .all(|f| f.kind == FailureKind::SupplierBadResponse));
            }
            other => panic!("expected NoReachableSuppliers, got {other:?}"),
        }
    }

    #[test]
    fn supplier_with_empty_feed_still_counts_as_reachable() {
        let batch = FeedBatch {
            feeds: vec![SupplierFeed {
                supplier_id: 1,
                offers: Vec::new(),
                rejected: Vec::new(),
            }],
            failures: Vec::new(),
        };

        let (winners, report) = aggregate(1, batch).unwrap();
        assert!(winners.is_empty());
        assert_eq!(report.suppliers_succeeded, 1);
        assert!(report.failures.is_empty());
    }
}
