pub mod aggregate;
pub mod app_config;
pub mod config;
pub mod offers;
pub mod store;
pub mod suppliers;

pub use aggregate::{reduce, WinningOfferMap};
pub use app_config::{AppConfig, Environment, ImagePolicy};
pub use config::{load_app_config, load_app_config_from_env};
pub use offers::{CatalogFields, CatalogRecord, RawOffer, Supplier};
pub use store::{CatalogStore, Lookup, StoreError, SupplierRegistry};
pub use suppliers::{load_suppliers, SupplierConfig, SuppliersFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read suppliers file {path}: {source}")]
    SuppliersFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse suppliers file: {0}")]
    SuppliersFileParse(#[from] serde_yaml::Error),

    #[error("suppliers file validation failed: {0}")]
    Validation(String),
}
