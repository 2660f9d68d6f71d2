use crate::app_config::{AppConfig, Environment, ImagePolicy};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a pure
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("CELLAR_ENV", "development"))?;
    let log_level = or_default("CELLAR_LOG_LEVEL", "info");
    let suppliers_path = PathBuf::from(or_default(
        "CELLAR_SUPPLIERS_PATH",
        "./config/suppliers.yaml",
    ));
    let blob_root = PathBuf::from(or_default("CELLAR_BLOB_ROOT", "./public/images"));

    let db_max_connections = parse_u32("CELLAR_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CELLAR_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("CELLAR_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let feed_request_timeout_secs = parse_u64("CELLAR_FEED_REQUEST_TIMEOUT_SECS", "10")?;
    if feed_request_timeout_secs == 0 {
        return Err(invalid(
            "CELLAR_FEED_REQUEST_TIMEOUT_SECS",
            "timeout must be at least 1 second".to_string(),
        ));
    }
    let feed_user_agent = or_default("CELLAR_FEED_USER_AGENT", "cellar/0.1 (supplier-sync)");
    let feed_max_concurrent_suppliers = parse_usize("CELLAR_FEED_MAX_CONCURRENT_SUPPLIERS", "0")?;
    let feed_max_retries = parse_u32("CELLAR_FEED_MAX_RETRIES", "0")?;
    let feed_retry_backoff_base_secs = parse_u64("CELLAR_FEED_RETRY_BACKOFF_BASE_SECS", "1")?;

    let reconcile_max_concurrent = parse_usize("CELLAR_RECONCILE_MAX_CONCURRENT", "4")?;
    let image_policy = parse_image_policy(&or_default("CELLAR_IMAGE_POLICY", "skip-image"))?;

    let sync_schedule = or_default("CELLAR_SYNC_SCHEDULE", "0 */15 * * * *");
    if sync_schedule.split_whitespace().count() != 6 {
        return Err(invalid(
            "CELLAR_SYNC_SCHEDULE",
            format!("expected a six-field cron expression, got \"{sync_schedule}\""),
        ));
    }
    let sync_min_interval_secs = parse_u64("CELLAR_SYNC_MIN_INTERVAL_SECS", "120")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        suppliers_path,
        blob_root,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        feed_request_timeout_secs,
        feed_user_agent,
        feed_max_concurrent_suppliers,
        feed_max_retries,
        feed_retry_backoff_base_secs,
        reconcile_max_concurrent,
        image_policy,
        sync_schedule,
        sync_min_interval_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CELLAR_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_image_policy(s: &str) -> Result<ImagePolicy, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "skip-image" => Ok(ImagePolicy::SkipImage),
        "skip-offer" => Ok(ImagePolicy::SkipOffer),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CELLAR_IMAGE_POLICY".to_string(),
            reason: format!("expected \"skip-image\" or \"skip-offer\", got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
