//! Concurrent fetch across every supplier for one sync run.

use cellar_core::Supplier;
use futures::future::FutureExt;
use futures::stream::{self, StreamExt};

use crate::types::{FeedBatch, FeedFailure};

use super::FeedClient;

impl FeedClient {
    /// Fetches every supplier's inventory, at most `max_concurrent` at a time
    /// (`0` means all suppliers at once).
    ///
    /// Never fails as a whole: a supplier that errors is recorded in
    /// [`FeedBatch::failures`] and the others proceed. Successful feeds come
    /// back in supplier enumeration order regardless of completion order, so
    /// cheapest-offer tie-breaking stays deterministic.
    pub async fn fetch_all(&self, suppliers: &[Supplier], max_concurrent: usize) -> FeedBatch {
        let limit = if max_concurrent == 0 {
            suppliers.len().max(1)
        } else {
            max_concurrent
        };

        let results: Vec<_> = stream::iter(suppliers)
            .map(|supplier| async move { (supplier, self.fetch_supplier(supplier).await) })
            .buffered(limit)
            .collect::<Vec<_>>()
            .boxed()
            .await;

        let mut batch = FeedBatch::default();
        for (supplier, result) in results {
            match result {
                Ok(feed) => {
                    tracing::info!(
                        supplier_id = supplier.id,
                        supplier = %supplier.name,
                        offers = feed.offers.len(),
                        rejected = feed.rejected.len(),
                        "fetched supplier feed"
                    );
                    batch.feeds.push(feed);
                }
                Err(error) => {
                    tracing::error!(
                        supplier_id = supplier.id,
                        supplier = %supplier.name,
                        error = %error,
                        "supplier feed failed; excluding supplier from this run"
                    );
                    batch.failures.push(FeedFailure {
                        supplier_id: supplier.id,
                        supplier_name: supplier.name.clone(),
                        error,
                    });
                }
            }
        }

        batch
    }
}
