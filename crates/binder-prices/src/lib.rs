//! Price intelligence core for the binder collection manager.
//!
//! Maintains a queryable in-memory cache of MTGJSON retail prices for
//! hundreds of thousands of card printings, backed by a single-file disk
//! snapshot. The two upstream documents (`AllPricesToday.json`,
//! `AllIdentifiers.json`) are ingested by streaming parse in bounded memory;
//! the resulting indices are published behind one atomic reference so that
//! lookups from request handlers never contend and always observe a
//! consistent pair.
//!
//! The [`PriceService`] is the single writer: it refreshes both documents on
//! demand (single-flight), preserves whichever index a partial upstream
//! outage could not rebuild, and persists the authoritative snapshot
//! best-effort. Lookups and valuation never fail — a missing price is a
//! valid `None`.

mod cache;
mod error;
mod fetch;
mod index;
mod lookup;
mod refresh;
mod stream;
mod types;
mod valuation;

pub use error::PriceError;
pub use index::{BridgeIndex, PriceIndex, Snapshot};
pub use refresh::{
    PriceService, PriceServiceConfig, RefreshOutcome, RefreshReport, ServiceState,
};
pub use types::{PriceRecord, PriceSource, SourcePrices};
pub use valuation::{
    best_available_unit_price, value_best_available, value_inventory, ValuationTotals,
};
