use std::path::PathBuf;

/// Process-wide configuration for the binder price services.
///
/// Built from environment variables by [`crate::load_app_config`]; every
/// option has a default, so a bare environment yields a working config
/// pointed at the production MTGJSON endpoints.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// MTGJSON `AllPricesToday.json` endpoint.
    pub price_url: String,
    /// MTGJSON `AllIdentifiers.json` endpoint. An order of magnitude larger
    /// than the price document, hence its own fetch deadline.
    pub identifier_url: String,
    pub cache_path: PathBuf,
    pub cache_ttl_millis: u64,
    pub price_fetch_timeout_millis: u64,
    pub identifier_fetch_timeout_millis: u64,
    /// Entries between progress logs while walking the identifier document.
    pub progress_interval: usize,
    pub user_agent: String,
    /// Cron expression driving the daemon's staleness checks.
    pub refresh_cron: String,
}
