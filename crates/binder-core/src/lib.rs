mod app_config;
mod config;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};

/// One row of a collection inventory: a printing reference and how many
/// copies are held.
///
/// `scryfall_id` is `None` when the importer could not resolve the row to a
/// catalog printing; such rows are still counted by the valuation engine,
/// just never priced from the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    pub scryfall_id: Option<Uuid>,
    pub quantity: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
