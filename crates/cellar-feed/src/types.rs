//! Supplier feed response types and per-run fetch results.
//!
//! ## Wire shape
//!
//! ```json
//! {"data": {"wines": [{"upc": "0012345", "price": 9.99, "image": "data:image/png;base64,...", "name": "..."}]}}
//! ```
//!
//! Entries are kept as raw JSON values at the envelope level so that one bad
//! entry cannot fail the whole response; [`crate::parse::parse_offer`]
//! validates each entry on its own. A body without a `data.wines` array is a
//! bad response for the supplier as a whole.

use cellar_core::RawOffer;
use serde::Deserialize;

use crate::error::FeedError;

/// Top-level response from `GET {base_url}/wines`.
#[derive(Debug, Deserialize)]
pub struct FeedEnvelope {
    pub data: FeedData,
}

#[derive(Debug, Deserialize)]
pub struct FeedData {
    pub wines: Vec<serde_json::Value>,
}

/// An entry that was dropped from an otherwise good response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedOffer {
    pub supplier_id: i64,
    /// Zero-based position of the entry in `data.wines`.
    pub index: usize,
    pub reason: String,
}

/// Everything usable from one supplier's response.
#[derive(Debug, Clone)]
pub struct SupplierFeed {
    pub supplier_id: i64,
    /// Valid offers, in response order.
    pub offers: Vec<RawOffer>,
    pub rejected: Vec<MalformedOffer>,
}

/// A supplier whose offers are excluded from this run.
#[derive(Debug)]
pub struct FeedFailure {
    pub supplier_id: i64,
    pub supplier_name: String,
    pub error: FeedError,
}

/// Result of polling every supplier once.
#[derive(Debug, Default)]
pub struct FeedBatch {
    /// Successful feeds in supplier enumeration order.
    pub feeds: Vec<SupplierFeed>,
    pub failures: Vec<FeedFailure>,
}

impl FeedBatch {
    /// All valid offers, in supplier order then response order.
    pub fn offers(&self) -> impl Iterator<Item = &RawOffer> {
        self.feeds.iter().flat_map(|feed| feed.offers.iter())
    }

    /// Consumes the batch into its offers (same order as [`Self::offers`]),
    /// rejected entries, and supplier failures.
    #[must_use]
    pub fn into_parts(self) -> (Vec<RawOffer>, Vec<MalformedOffer>, Vec<FeedFailure>) {
        let mut offers = Vec::new();
        let mut rejected = Vec::new();
        for feed in self.feeds {
            offers.extend(feed.offers);
            rejected.extend(feed.rejected);
        }
        (offers, rejected, self.failures)
    }

    #[must_use]
    pub fn offer_count(&self) -> usize {
        self.feeds.iter().map(|feed| feed.offers.len()).sum()
    }
}
