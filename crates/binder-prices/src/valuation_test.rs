use std::sync::Arc;

use binder_core::InventoryRow;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{best_available_unit_price, value_best_available, value_inventory};
use crate::index::{BridgeIndex, PriceIndex, Snapshot};
use crate::refresh::{PriceService, PriceServiceConfig};
use crate::types::{PriceRecord, PriceSource, SourcePrices};

fn uuid(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

const U1: u128 = 1;
const U2: u128 = 2;
const C1: u128 = 101;
const C2: u128 = 102;
const C_MISSING: u128 = 999;

/// Index fixture: C1→U1 (cardkingdom $2.00, tcgplayer $1.50),
/// C2→U2 (tcgplayer $5.00 only), C_MISSING unbridged.
fn service_with_fixture() -> Arc<PriceService> {
    let mut prices = PriceIndex::default();

    let mut u1 = PriceRecord::default();
    u1.cardkingdom.insert("2024-01-02".to_owned(), dec("2.00"));
    u1.tcgplayer.insert("2024-01-02".to_owned(), dec("1.50"));
    prices.insert(uuid(U1), u1);

    let mut u2 = PriceRecord::default();
    u2.tcgplayer.insert("2024-01-02".to_owned(), dec("5.00"));
    prices.insert(uuid(U2), u2);

    let mut catalog_map = BridgeIndex::default();
    catalog_map.insert(uuid(C1), uuid(U1));
    catalog_map.insert(uuid(C2), uuid(U2));

    let service = PriceService::new(PriceServiceConfig::default()).unwrap();
    service.install_snapshot(Snapshot {
        refreshed_at: None,
        prices: Arc::new(prices),
        catalog_map: Arc::new(catalog_map),
    });
    service
}

fn row(scryfall: Option<u128>, quantity: u32) -> InventoryRow {
    InventoryRow {
        scryfall_id: scryfall.map(uuid),
        quantity,
    }
}

#[tokio::test]
async fn values_mixed_availability_inventory() {
    let service = service_with_fixture();
    let rows = vec![row(Some(C1), 4), row(Some(C2), 2), row(Some(C_MISSING), 1)];

    let totals = value_inventory(&service, &rows);

    assert_eq!(totals.cardkingdom, dec("8.00"));
    assert_eq!(totals.tcgplayer, dec("16.00"));
    assert_eq!(totals.rows_missing_identifier, 1);
    assert_eq!(totals.rows_missing_price, 0);
}

#[tokio::test]
async fn counts_rows_without_any_identifier() {
    let service = service_with_fixture();
    let rows = vec![row(None, 3), row(Some(C1), 1)];

    let totals = value_inventory(&service, &rows);

    assert_eq!(totals.rows_missing_identifier, 1);
    assert_eq!(totals.cardkingdom, dec("2.00"));
}

#[tokio::test]
async fn counts_bridged_rows_with_no_priced_channel() {
    let service = service_with_fixture();
    // A disk-loaded record can carry only non-positive values; the lookup
    // guard reports both channels as unpriced for such a row.
    let mut prices = PriceIndex::default();
    let mut stale_record = PriceRecord::default();
    stale_record.tcgplayer.insert("2024-01-01".to_owned(), dec("0"));
    prices.insert(uuid(U2), stale_record);
    let mut catalog_map = BridgeIndex::default();
    catalog_map.insert(uuid(C2), uuid(U2));
    service.install_snapshot(Snapshot {
        refreshed_at: None,
        prices: Arc::new(prices),
        catalog_map: Arc::new(catalog_map),
    });

    let totals = value_inventory(&service, &[row(Some(C2), 2)]);
    assert_eq!(totals.rows_missing_price, 1);
    assert_eq!(totals.rows_missing_identifier, 0);
    assert_eq!(totals.tcgplayer, Decimal::ZERO);
}

#[tokio::test]
async fn empty_inventory_yields_zero_totals() {
    let service = service_with_fixture();
    let totals = value_inventory(&service, &[]);
    assert_eq!(totals, super::ValuationTotals::default());
}

#[tokio::test]
async fn best_available_prefers_then_falls_through() {
    let service = service_with_fixture();
    let rows = vec![
        (row(Some(C1), 4), Some(dec("1.00"))),
        (row(Some(C2), 2), Some(dec("3.00"))),
        (row(Some(C_MISSING), 1), Some(dec("0.25"))),
    ];
    let pairs: Vec<(&InventoryRow, Option<Decimal>)> =
        rows.iter().map(|(r, f)| (r, *f)).collect();

    // C1 uses its cardkingdom price, C2 falls through to tcgplayer, the
    // unbridged row uses the supplied fallback.
    let total = value_best_available(&service, pairs, PriceSource::CardKingdom);
    assert_eq!(total, dec("18.25"));
}

#[tokio::test]
async fn best_available_without_fallback_skips_unpriced_rows() {
    let service = service_with_fixture();
    let rows = vec![(row(Some(C_MISSING), 5), None)];
    let pairs: Vec<(&InventoryRow, Option<Decimal>)> =
        rows.iter().map(|(r, f)| (r, *f)).collect();

    let total = value_best_available(&service, pairs, PriceSource::Tcgplayer);
    assert_eq!(total, Decimal::ZERO);
}

#[test]
fn unit_price_selection_order() {
    let both = SourcePrices {
        cardkingdom: Some(dec("2.00")),
        tcgplayer: Some(dec("1.50")),
    };
    let only_other = SourcePrices {
        cardkingdom: None,
        tcgplayer: Some(dec("5.00")),
    };
    let neither = SourcePrices::default();

    assert_eq!(
        best_available_unit_price(&both, PriceSource::CardKingdom, None),
        Some(dec("2.00"))
    );
    assert_eq!(
        best_available_unit_price(&only_other, PriceSource::CardKingdom, Some(dec("3.00"))),
        Some(dec("5.00"))
    );
    assert_eq!(
        best_available_unit_price(&neither, PriceSource::CardKingdom, Some(dec("0.25"))),
        Some(dec("0.25"))
    );
    assert_eq!(
        best_available_unit_price(&neither, PriceSource::Tcgplayer, None),
        None
    );
}
