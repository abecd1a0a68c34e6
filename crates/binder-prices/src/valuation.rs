//! Inventory valuation over the price snapshot.
//!
//! Stateless: every pass takes one snapshot on entry and aggregates row by
//! row against that consistent pair. Valuation never fails — rows the index
//! cannot price are counted, not errored.

use binder_core::InventoryRow;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::refresh::PriceService;
use crate::types::{PriceSource, SourcePrices};

/// Totals of one valuation pass, one independent total per retail channel.
///
/// The two channels are not comparable row counts: a row contributes to each
/// channel it has a price for, so the missing counters are row-level, not
/// per-channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValuationTotals {
    pub cardkingdom: Decimal,
    pub tcgplayer: Decimal,
    /// Rows with no catalog id, or one the bridge cannot resolve.
    pub rows_missing_identifier: usize,
    /// Rows that resolved to a printing with no price on either channel.
    pub rows_missing_price: usize,
}

/// Sums `quantity × current price` over the inventory for both retail
/// channels.
pub fn value_inventory<'a, I>(service: &PriceService, rows: I) -> ValuationTotals
where
    I: IntoIterator<Item = &'a InventoryRow>,
{
    let snapshot = service.snapshot();
    let mut totals = ValuationTotals::default();

    for row in rows {
        let record = row
            .scryfall_id
            .and_then(|scryfall_id| snapshot.catalog_map.resolve(&scryfall_id))
            .and_then(|printing_id| snapshot.prices.get(&printing_id));
        let Some(record) = record else {
            totals.rows_missing_identifier += 1;
            continue;
        };

        let prices = record.current_prices();
        let quantity = Decimal::from(row.quantity);
        let mut priced = false;
        if let Some(price) = prices.cardkingdom {
            totals.cardkingdom += price * quantity;
            priced = true;
        }
        if let Some(price) = prices.tcgplayer {
            totals.tcgplayer += price * quantity;
            priced = true;
        }
        if !priced {
            totals.rows_missing_price += 1;
        }
    }

    totals
}

/// Picks the representative unit price for one row: the preferred channel if
/// priced, else the other channel, else the caller-supplied fallback (for
/// example the owner's recorded purchase price).
#[must_use]
pub fn best_available_unit_price(
    prices: &SourcePrices,
    preferred: PriceSource,
    fallback: Option<Decimal>,
) -> Option<Decimal> {
    prices
        .get(preferred)
        .or_else(|| prices.get(preferred.other()))
        .or(fallback)
}

/// Sums a single representative price per row, for top-N and per-card
/// reports. Rows with no channel price and no fallback contribute nothing.
pub fn value_best_available<'a, I>(
    service: &PriceService,
    rows: I,
    preferred: PriceSource,
) -> Decimal
where
    I: IntoIterator<Item = (&'a InventoryRow, Option<Decimal>)>,
{
    let snapshot = service.snapshot();
    let mut total = Decimal::ZERO;

    for (row, fallback) in rows {
        let prices = row
            .scryfall_id
            .and_then(|scryfall_id| snapshot.catalog_map.resolve(&scryfall_id))
            .and_then(|printing_id| snapshot.prices.get(&printing_id))
            .map(|record| record.current_prices())
            .unwrap_or_default();
        if let Some(unit) = best_available_unit_price(&prices, preferred, fallback) {
            total += unit * Decimal::from(row.quantity);
        }
    }

    total
}

#[cfg(test)]
#[path = "valuation_test.rs"]
mod tests;
