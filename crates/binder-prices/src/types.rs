//! Price domain types and the raw MTGJSON wire shapes.
//!
//! ## Observed upstream shape
//!
//! Both documents are `{ "meta": {...}, "data": { "<printing-uuid>": ... } }`.
//! A price entry nests `paper → {cardkingdom, tcgplayer} → retail → normal`,
//! where `normal` is a `"YYYY-MM-DD" → price` object. Prices are usually JSON
//! numbers, but formatted strings (`"$1.23"`) have been observed in older
//! dumps; anything non-numeric is treated as missing rather than rejected.
//! An identifier entry carries `identifiers.catalogScryfallId`, which may be
//! absent or the empty string for printings with no catalog page.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The two retail channels tracked upstream.
///
/// Independently sourced: a missing price on one channel says nothing about
/// the other, and neither is ever synthesized from its sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceSource {
    CardKingdom,
    Tcgplayer,
}

impl PriceSource {
    pub const ALL: [PriceSource; 2] = [PriceSource::CardKingdom, PriceSource::Tcgplayer];

    /// The sibling channel, used by best-available fallback.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            PriceSource::CardKingdom => PriceSource::Tcgplayer,
            PriceSource::Tcgplayer => PriceSource::CardKingdom,
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSource::CardKingdom => write!(f, "cardkingdom"),
            PriceSource::Tcgplayer => write!(f, "tcgplayer"),
        }
    }
}

impl FromStr for PriceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cardkingdom" => Ok(PriceSource::CardKingdom),
            "tcgplayer" => Ok(PriceSource::Tcgplayer),
            other => Err(format!(
                "unknown price source \"{other}\" (expected cardkingdom or tcgplayer)"
            )),
        }
    }
}

/// Per-printing price record: one `date → price` history per retail channel.
///
/// Records are built fresh on every refresh and never mutated in place. An
/// inserted record always has at least one entry in one channel; builders
/// drop empty records before they reach the index. Date keys are ISO-8601
/// `YYYY-MM-DD`, which sorts correctly as strings — the [`BTreeMap`] order
/// is the chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cardkingdom: BTreeMap<String, Decimal>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tcgplayer: BTreeMap<String, Decimal>,
}

impl PriceRecord {
    #[must_use]
    pub fn history(&self, source: PriceSource) -> &BTreeMap<String, Decimal> {
        match source {
            PriceSource::CardKingdom => &self.cardkingdom,
            PriceSource::Tcgplayer => &self.tcgplayer,
        }
    }

    pub(crate) fn history_mut(&mut self, source: PriceSource) -> &mut BTreeMap<String, Decimal> {
        match source {
            PriceSource::CardKingdom => &mut self.cardkingdom,
            PriceSource::Tcgplayer => &mut self.tcgplayer,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cardkingdom.is_empty() && self.tcgplayer.is_empty()
    }

    /// Current price for a channel: the value at the greatest date key,
    /// reported only when positive. Disk-loaded records may carry values the
    /// builders would have dropped, hence the guard here as well.
    #[must_use]
    pub fn latest(&self, source: PriceSource) -> Option<Decimal> {
        self.history(source)
            .iter()
            .next_back()
            .map(|(_, price)| *price)
            .filter(|price| *price > Decimal::ZERO)
    }

    /// Both channels' current prices at once.
    #[must_use]
    pub fn current_prices(&self) -> SourcePrices {
        SourcePrices {
            cardkingdom: self.latest(PriceSource::CardKingdom),
            tcgplayer: self.latest(PriceSource::Tcgplayer),
        }
    }
}

/// Both retail channels for one printing, resolved against a single
/// consistent snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourcePrices {
    pub cardkingdom: Option<Decimal>,
    pub tcgplayer: Option<Decimal>,
}

impl SourcePrices {
    #[must_use]
    pub fn get(&self, source: PriceSource) -> Option<Decimal> {
        match source {
            PriceSource::CardKingdom => self.cardkingdom,
            PriceSource::Tcgplayer => self.tcgplayer,
        }
    }
}

/// Raw per-printing entry of the price document's `data` object.
#[derive(Debug, Deserialize)]
pub(crate) struct RawPriceEntry {
    #[serde(default)]
    pub paper: Option<RawPaperProviders>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPaperProviders {
    #[serde(default)]
    pub cardkingdom: Option<RawProviderPrices>,
    #[serde(default)]
    pub tcgplayer: Option<RawProviderPrices>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawProviderPrices {
    #[serde(default)]
    pub retail: Option<RawRetailPrices>,
}

/// Prices are kept as raw JSON values here so that a single bad price (a
/// formatted string, a null) drops that one date instead of the whole entry.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRetailPrices {
    #[serde(default)]
    pub normal: Option<BTreeMap<String, serde_json::Value>>,
}

/// Raw per-printing entry of the identifier document's `data` object.
#[derive(Debug, Deserialize)]
pub(crate) struct RawIdentifierEntry {
    #[serde(default)]
    pub identifiers: RawIdentifiers,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawIdentifiers {
    #[serde(default, rename = "catalogScryfallId")]
    pub catalog_scryfall_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn latest_picks_the_greatest_date_key() {
        let mut record = PriceRecord::default();
        record
            .cardkingdom
            .insert("2024-01-01".to_owned(), dec("1.00"));
        record
            .cardkingdom
            .insert("2024-01-02".to_owned(), dec("1.50"));
        assert_eq!(record.latest(PriceSource::CardKingdom), Some(dec("1.50")));
    }

    #[test]
    fn latest_is_none_for_empty_channel() {
        let mut record = PriceRecord::default();
        record.tcgplayer.insert("2024-01-01".to_owned(), dec("2.00"));
        assert_eq!(record.latest(PriceSource::CardKingdom), None);
        assert_eq!(record.latest(PriceSource::Tcgplayer), Some(dec("2.00")));
    }

    #[test]
    fn latest_rejects_non_positive_values_from_disk() {
        let mut record = PriceRecord::default();
        record.cardkingdom.insert("2024-03-01".to_owned(), dec("0"));
        assert_eq!(record.latest(PriceSource::CardKingdom), None);
    }

    #[test]
    fn source_round_trips_through_display_and_from_str() {
        for source in PriceSource::ALL {
            assert_eq!(source.to_string().parse::<PriceSource>(), Ok(source));
        }
        assert!("cardmarket".parse::<PriceSource>().is_err());
    }

    #[test]
    fn other_swaps_channels() {
        assert_eq!(PriceSource::CardKingdom.other(), PriceSource::Tcgplayer);
        assert_eq!(PriceSource::Tcgplayer.other(), PriceSource::CardKingdom);
    }

    #[test]
    fn raw_price_entry_tolerates_unknown_fields() {
        let entry: RawPriceEntry = serde_json::from_value(serde_json::json!({
            "paper": {
                "cardkingdom": {
                    "buylist": { "normal": { "2024-01-01": 0.5 } },
                    "retail": { "normal": { "2024-01-01": 1.0 }, "foil": {} },
                    "currency": "USD"
                }
            },
            "mtgo": {}
        }))
        .unwrap();
        let retail = entry
            .paper
            .unwrap()
            .cardkingdom
            .unwrap()
            .retail
            .unwrap()
            .normal
            .unwrap();
        assert_eq!(retail.len(), 1);
    }
}
