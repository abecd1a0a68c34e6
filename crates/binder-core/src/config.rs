use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a recognized env var holds an unparseable value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for
/// testing or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a recognized env var holds an unparseable value.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup — no
/// `set_var`/`remove_var` needed. Every option is defaulted; there are no
/// required variables.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let log_level = or_default("BINDER_LOG_LEVEL", "info");
    let price_url = or_default(
        "BINDER_PRICE_URL",
        "https://mtgjson.com/api/v5/AllPricesToday.json",
    );
    let identifier_url = or_default(
        "BINDER_IDENTIFIER_URL",
        "https://mtgjson.com/api/v5/AllIdentifiers.json",
    );
    let cache_path = PathBuf::from(or_default("BINDER_CACHE_PATH", "./data/price-cache.json"));

    let cache_ttl_millis = parse_u64("BINDER_CACHE_TTL_MILLIS", "86400000")?;
    let price_fetch_timeout_millis = parse_u64("BINDER_PRICE_FETCH_TIMEOUT_MILLIS", "120000")?;
    let identifier_fetch_timeout_millis =
        parse_u64("BINDER_IDENTIFIER_FETCH_TIMEOUT_MILLIS", "300000")?;
    let progress_interval = parse_usize("BINDER_PROGRESS_INTERVAL", "50000")?;

    let user_agent = or_default("BINDER_USER_AGENT", "binder/0.1 (price-intelligence)");
    let refresh_cron = or_default("BINDER_REFRESH_CRON", "0 0 */6 * * *");

    Ok(AppConfig {
        log_level,
        price_url,
        identifier_url,
        cache_path,
        cache_ttl_millis,
        price_fetch_timeout_millis,
        identifier_fetch_timeout_millis,
        progress_interval,
        user_agent,
        refresh_cron,
    })
}
