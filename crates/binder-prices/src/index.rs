//! In-memory indices and their streaming builders.
//!
//! The price index is rebuilt wholesale from the price document; the bridge
//! index maps Scryfall catalog ids to MTGJSON printing ids and is filtered
//! to printings that actually carry a price record. The filter is essential:
//! the identifier document holds an order of magnitude more entries than the
//! price document, and inserting them all would waste memory without
//! enabling a single lookup.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PriceError;
use crate::stream::for_each_data_entry;
use crate::types::{PriceRecord, PriceSource, RawIdentifierEntry, RawPriceEntry};

/// Map from MTGJSON printing UUID to its per-channel retail histories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceIndex(HashMap<Uuid, PriceRecord>);

impl PriceIndex {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, printing_id: &Uuid) -> Option<&PriceRecord> {
        self.0.get(printing_id)
    }

    #[must_use]
    pub fn contains(&self, printing_id: &Uuid) -> bool {
        self.0.contains_key(printing_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &PriceRecord)> {
        self.0.iter()
    }

    pub(crate) fn insert(&mut self, printing_id: Uuid, record: PriceRecord) {
        self.0.insert(printing_id, record);
    }
}

/// Map from Scryfall catalog UUID to MTGJSON printing UUID, holding only
/// printings present in the price index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeIndex(HashMap<Uuid, Uuid>);

impl BridgeIndex {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn resolve(&self, scryfall_id: &Uuid) -> Option<Uuid> {
        self.0.get(scryfall_id).copied()
    }

    pub(crate) fn insert(&mut self, scryfall_id: Uuid, printing_id: Uuid) {
        self.0.insert(scryfall_id, printing_id);
    }
}

/// Counters reported by a streaming index build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Entries visited in the `data` object.
    pub total: usize,
    /// Entries that produced an index insertion.
    pub kept: usize,
    /// Entries skipped because they could not be decoded.
    pub malformed: usize,
}

/// The pair of indices published together, plus price freshness.
///
/// Readers obtain the whole snapshot through one atomic load, so a bridge
/// entry can never point at a printing the paired price index lacks.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// When the price index was last rebuilt from upstream. Bridge-only
    /// refreshes do not advance this; the freshness check governs prices.
    pub refreshed_at: Option<DateTime<Utc>>,
    pub prices: Arc<PriceIndex>,
    pub catalog_map: Arc<BridgeIndex>,
}

impl Snapshot {
    pub(crate) fn empty() -> Self {
        Self {
            refreshed_at: None,
            prices: Arc::new(PriceIndex::default()),
            catalog_map: Arc::new(BridgeIndex::default()),
        }
    }

    /// Stale when the prices have never been refreshed or their timestamp
    /// is older than `ttl`.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration) -> bool {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        match self.refreshed_at {
            None => true,
            Some(ts) => Utc::now().signed_duration_since(ts).num_milliseconds() > ttl_millis,
        }
    }
}

/// Builds a fresh price index from a price document stream.
///
/// # Errors
///
/// Returns [`PriceError::MalformedDocument`] on a fatal stream error; the
/// caller preserves its previous index in that case.
pub(crate) fn build_price_index<R: Read>(reader: R) -> Result<(PriceIndex, BuildStats), PriceError> {
    let mut index = PriceIndex::default();
    let mut stats = BuildStats::default();
    let total = for_each_data_entry("price", reader, |key, value| {
        match decode_price_entry(&key, value) {
            Ok(Some((printing_id, record))) => {
                index.insert(printing_id, record);
                stats.kept += 1;
            }
            Ok(None) => {}
            Err(()) => stats.malformed += 1,
        }
    })?;
    stats.total = total;
    tracing::info!(
        total = stats.total,
        kept = stats.kept,
        malformed = stats.malformed,
        "price index built"
    );
    Ok((index, stats))
}

/// Builds a fresh bridge index from an identifier document stream, keeping
/// only entries whose printing id appears in `prices`.
///
/// Logs progress every `progress_interval` entries; the identifier walk is
/// the long pole of a refresh and otherwise looks like a hang.
///
/// # Errors
///
/// Returns [`PriceError::MalformedDocument`] on a fatal stream error.
pub(crate) fn build_bridge_index<R: Read>(
    reader: R,
    prices: &PriceIndex,
    progress_interval: usize,
) -> Result<(BridgeIndex, BuildStats), PriceError> {
    let mut bridge = BridgeIndex::default();
    let mut stats = BuildStats::default();
    let mut seen = 0usize;
    let total = for_each_data_entry("identifier", reader, |key, value| {
        seen += 1;
        if progress_interval > 0 && seen % progress_interval == 0 {
            tracing::info!(processed = seen, kept = stats.kept, "identifier walk progress");
        }
        match decode_identifier_entry(&key, value) {
            Ok(Some((printing_id, scryfall_id))) => {
                if prices.contains(&printing_id) {
                    bridge.insert(scryfall_id, printing_id);
                    stats.kept += 1;
                }
            }
            Ok(None) => {}
            Err(()) => stats.malformed += 1,
        }
    })?;
    stats.total = total;
    tracing::info!(
        total = stats.total,
        kept = stats.kept,
        malformed = stats.malformed,
        "identifier bridge built"
    );
    Ok((bridge, stats))
}

/// Decodes one price entry. `Ok(None)` means validly shaped but nothing
/// priced; `Err(())` means the entry is malformed — a non-UUID key, an
/// unexpected shape, or a date key that is not `YYYY-MM-DD`.
fn decode_price_entry(
    key: &str,
    value: serde_json::Value,
) -> Result<Option<(Uuid, PriceRecord)>, ()> {
    let printing_id = Uuid::parse_str(key).map_err(|_| ())?;
    let entry: RawPriceEntry = serde_json::from_value(value).map_err(|_| ())?;
    let Some(paper) = entry.paper else {
        return Ok(None);
    };

    let mut record = PriceRecord::default();
    let providers = [
        (PriceSource::CardKingdom, paper.cardkingdom),
        (PriceSource::Tcgplayer, paper.tcgplayer),
    ];
    for (source, provider) in providers {
        let Some(retail) = provider.and_then(|p| p.retail).and_then(|r| r.normal) else {
            continue;
        };
        let history = record.history_mut(source);
        for (date, raw_price) in retail {
            if NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_err() {
                return Err(());
            }
            // Non-numeric and non-positive values are missing, not errors.
            let Some(price) = raw_price
                .as_f64()
                .filter(|price| *price > 0.0)
                .and_then(|price| Decimal::try_from(price).ok())
            else {
                continue;
            };
            history.insert(date, price);
        }
    }

    if record.is_empty() {
        Ok(None)
    } else {
        Ok(Some((printing_id, record)))
    }
}

/// Decodes one identifier entry. `Ok(None)` means no usable catalog id —
/// the common case for printings without a catalog page.
fn decode_identifier_entry(key: &str, value: serde_json::Value) -> Result<Option<(Uuid, Uuid)>, ()> {
    let printing_id = Uuid::parse_str(key).map_err(|_| ())?;
    let entry: RawIdentifierEntry = serde_json::from_value(value).map_err(|_| ())?;
    let Some(raw) = entry.identifiers.catalog_scryfall_id else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    let scryfall_id = Uuid::parse_str(&raw).map_err(|_| ())?;
    Ok(Some((printing_id, scryfall_id)))
}

#[cfg(test)]
#[path = "index_test.rs"]
mod tests;
