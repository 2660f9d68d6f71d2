use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("supplier unreachable at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("rate limited by {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid supplier base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl FeedError {
    /// `true` when the supplier could not be reached at all (connect failure,
    /// timeout, dropped connection), as opposed to answering with something
    /// unusable.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, FeedError::Unreachable { .. })
    }
}
