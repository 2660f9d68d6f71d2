use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A supplier entry from `config/suppliers.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuppliersFile {
    pub suppliers: Vec<SupplierConfig>,
}

/// Load and validate the supplier registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_suppliers(path: &Path) -> Result<SuppliersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SuppliersFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: SuppliersFile = serde_yaml::from_str(&content)?;
    validate_suppliers(&file)?;

    Ok(file)
}

fn validate_suppliers(file: &SuppliersFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();
    let mut seen_urls = HashSet::new();

    for supplier in &file.suppliers {
        if supplier.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "supplier name must be non-empty".to_string(),
            ));
        }

        let url = supplier.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' has base_url \"{}\"; must start with http:// or https://",
                supplier.name, supplier.base_url
            )));
        }

        if !seen_names.insert(supplier.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate supplier name: '{}'",
                supplier.name
            )));
        }

        if !seen_urls.insert(url.trim_end_matches('/').to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate supplier base_url: '{}' (from supplier '{}')",
                supplier.base_url, supplier.name
            )));
        }
    }

    Ok(())
}
