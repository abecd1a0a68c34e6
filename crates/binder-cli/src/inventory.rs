//! Inventory file loading for the `value` command.

use std::path::Path;

use anyhow::Context;
use binder_core::InventoryRow;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// One row of the inventory JSON file. `purchasePrice` doubles as the
/// best-available fallback unit price for rows the index cannot price.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InventoryFileRow {
    #[serde(default)]
    pub scryfall_id: Option<Uuid>,
    pub quantity: u32,
    #[serde(default)]
    pub purchase_price: Option<Decimal>,
}

impl InventoryFileRow {
    pub(crate) fn as_inventory_row(&self) -> InventoryRow {
        InventoryRow {
            scryfall_id: self.scryfall_id,
            quantity: self.quantity,
        }
    }
}

/// Reads a JSON array of inventory rows.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse as a row array.
pub(crate) fn load_inventory(path: &Path) -> anyhow::Result<Vec<InventoryFileRow>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading inventory file {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing inventory file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_optional_fields() {
        let rows: Vec<InventoryFileRow> = serde_json::from_str(
            r#"[
                {"scryfallId":"56ebc372-aabd-4174-a943-c7bf59e5028d","quantity":4,"purchasePrice":1.25},
                {"scryfallId":null,"quantity":1},
                {"quantity":2,"purchasePrice":"0.25"}
            ]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].scryfall_id.is_some());
        assert_eq!(rows[0].purchase_price, Some("1.25".parse().unwrap()));
        assert!(rows[1].scryfall_id.is_none());
        assert!(rows[1].purchase_price.is_none());
        assert_eq!(rows[2].purchase_price, Some("0.25".parse().unwrap()));
    }

    #[test]
    fn load_inventory_reports_the_failing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, b"{not an array").unwrap();
        let err = load_inventory(&path).unwrap_err();
        assert!(err.to_string().contains("inventory.json"));
    }
}
