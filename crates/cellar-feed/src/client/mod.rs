//! HTTP client for supplier inventory feeds.

mod fetch_all;

use std::time::Duration;

use cellar_core::Supplier;
use reqwest::{Client, Url};

use crate::error::FeedError;
use crate::parse::parse_offer;
use crate::retry::retry_with_backoff;
use crate::types::{FeedEnvelope, MalformedOffer, SupplierFeed};

/// Inventory resource, relative to each supplier's base URL.
const WINES_PATH: &str = "wines";

/// HTTP client for the `GET {base_url}/wines` supplier feed.
///
/// Each request carries its own timeout. Non-200 statuses, transport errors,
/// and unparseable bodies surface as typed [`FeedError`]s so the caller can
/// exclude the supplier from the run without affecting the others.
pub struct FeedClient {
    client: Client,
    /// Additional attempts after the first failure. `0` disables retries.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    backoff_base_secs: u64,
}

impl FeedClient {
    /// Creates a `FeedClient` with a per-request timeout, `User-Agent`, and
    /// retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            max_retries,
            backoff_base_secs,
        })
    }

    /// Fetches and parses one supplier's inventory.
    ///
    /// Entries that fail validation are returned in
    /// [`SupplierFeed::rejected`]; the rest of the response is kept.
    ///
    /// # Errors
    ///
    /// - [`FeedError::InvalidBaseUrl`]: the supplier's base URL cannot be parsed.
    /// - [`FeedError::Unreachable`]: connect failure or timeout.
    /// - [`FeedError::RateLimited`]: HTTP 429.
    /// - [`FeedError::UnexpectedStatus`]: any status other than 200.
    /// - [`FeedError::Deserialize`]: body is not JSON or has no `data.wines` array.
    pub async fn fetch_supplier(&self, supplier: &Supplier) -> Result<SupplierFeed, FeedError> {
        let url = Self::wines_url(&supplier.base_url)?;

        let envelope = retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            async move { self.request_envelope(url).await }
        })
        .await?;

        let mut offers = Vec::with_capacity(envelope.data.wines.len());
        let mut rejected = Vec::new();
        for (index, entry) in envelope.data.wines.into_iter().enumerate() {
            match parse_offer(entry, supplier.id) {
                Ok(offer) => offers.push(offer),
                Err(reason) => {
                    tracing::warn!(
                        supplier_id = supplier.id,
                        index,
                        reason = %reason,
                        "skipping malformed offer"
                    );
                    rejected.push(MalformedOffer {
                        supplier_id: supplier.id,
                        index,
                        reason,
                    });
                }
            }
        }

        Ok(SupplierFeed {
            supplier_id: supplier.id,
            offers,
            rejected,
        })
    }

    async fn request_envelope(&self, url: Url) -> Result<FeedEnvelope, FeedError> {
        let url_str = url.to_string();
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| FeedError::Unreachable {
                url: url_str.clone(),
                source,
            })?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(FeedError::RateLimited {
                url: url_str,
                retry_after_secs,
            });
        }

        if status != reqwest::StatusCode::OK {
            return Err(FeedError::UnexpectedStatus {
                status: status.as_u16(),
                url: url_str,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FeedError::Unreachable {
                url: url_str.clone(),
                source,
            })?;

        serde_json::from_str::<FeedEnvelope>(&body).map_err(|e| FeedError::Deserialize {
            context: format!("wines feed from {url_str}"),
            source: e,
        })
    }

    /// Builds the inventory URL for a supplier base URL.
    ///
    /// The base is treated as a directory whether or not it ends in `/`, so
    /// `https://s.example/api` and `https://s.example/api/` both resolve to
    /// `https://s.example/api/wines`. Query strings and fragments on the base
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidBaseUrl`] if the base URL is not an
    /// absolute `http(s)` URL.
    fn wines_url(base_url: &str) -> Result<Url, FeedError> {
        let invalid = |reason: String| FeedError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason,
        };

        let mut base = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme \"{}\"", base.scheme())));
        }
        base.set_query(None);
        base.set_fragment(None);
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join(WINES_PATH).map_err(|e| invalid(e.to_string()))
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
