use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// What reconciliation does with an offer whose image cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePolicy {
    /// Write the catalog record anyway and report the image failure.
    #[default]
    SkipImage,
    /// Abort reconciliation of that single offer.
    SkipOffer,
}

impl std::fmt::Display for ImagePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImagePolicy::SkipImage => write!(f, "skip-image"),
            ImagePolicy::SkipOffer => write!(f, "skip-offer"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub suppliers_path: PathBuf,
    pub blob_root: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub feed_request_timeout_secs: u64,
    pub feed_user_agent: String,
    /// `0` means one in-flight request per supplier.
    pub feed_max_concurrent_suppliers: usize,
    pub feed_max_retries: u32,
    pub feed_retry_backoff_base_secs: u64,
    pub reconcile_max_concurrent: usize,
    pub image_policy: ImagePolicy,
    /// Six-field cron expression (seconds first) used by `cellar-cli schedule`.
    pub sync_schedule: String,
    pub sync_min_interval_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("suppliers_path", &self.suppliers_path)
            .field("blob_root", &self.blob_root)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("feed_request_timeout_secs", &self.feed_request_timeout_secs)
            .field("feed_user_agent", &self.feed_user_agent)
            .field(
                "feed_max_concurrent_suppliers",
                &self.feed_max_concurrent_suppliers,
            )
            .field("feed_max_retries", &self.feed_max_retries)
            .field(
                "feed_retry_backoff_base_secs",
                &self.feed_retry_backoff_base_secs,
            )
            .field("reconcile_max_concurrent", &self.reconcile_max_concurrent)
            .field("image_policy", &self.image_policy)
            .field("sync_schedule", &self.sync_schedule)
            .field("sync_min_interval_secs", &self.sync_min_interval_secs)
            .finish()
    }
}
