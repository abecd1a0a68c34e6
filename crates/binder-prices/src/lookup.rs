//! Synchronous price lookups against the current snapshot.
//!
//! Every entry point loads the snapshot exactly once and resolves entirely
//! against that consistent pair, so a bridge hit can never dangle. Lookups
//! never block and never fail: an unknown id or an unpriced channel is a
//! plain `None`.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::refresh::PriceService;
use crate::types::{PriceSource, SourcePrices};

impl PriceService {
    /// Most recent retail price for an MTGJSON printing on one channel.
    #[must_use]
    pub fn price_by_printing_id(&self, printing_id: &Uuid, source: PriceSource) -> Option<Decimal> {
        self.snapshot
            .load()
            .prices
            .get(printing_id)
            .and_then(|record| record.latest(source))
    }

    /// Most recent retail price for a Scryfall catalog id on one channel,
    /// resolved through the bridge index.
    #[must_use]
    pub fn price_by_scryfall_id(&self, scryfall_id: &Uuid, source: PriceSource) -> Option<Decimal> {
        let snapshot = self.snapshot.load();
        let printing_id = snapshot.catalog_map.resolve(scryfall_id)?;
        snapshot
            .prices
            .get(&printing_id)
            .and_then(|record| record.latest(source))
    }

    /// Both retail channels for one catalog id in a single resolution — the
    /// common valuation shape.
    #[must_use]
    pub fn prices_by_scryfall_id(&self, scryfall_id: &Uuid) -> SourcePrices {
        let snapshot = self.snapshot.load();
        let resolved = snapshot
            .catalog_map
            .resolve(scryfall_id)
            .and_then(|printing_id| snapshot.prices.get(&printing_id));
        match resolved {
            Some(record) => record.current_prices(),
            None => SourcePrices::default(),
        }
    }

    /// Bridge resolution on its own, for per-card reports that want the
    /// upstream printing id alongside the prices.
    #[must_use]
    pub fn resolve_printing_id(&self, scryfall_id: &Uuid) -> Option<Uuid> {
        self.snapshot.load().catalog_map.resolve(scryfall_id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::index::{BridgeIndex, PriceIndex, Snapshot};
    use crate::refresh::{PriceService, PriceServiceConfig};
    use crate::types::{PriceRecord, PriceSource};

    fn uuid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn service_with_fixture() -> Arc<PriceService> {
        let mut prices = PriceIndex::default();

        let mut u1 = PriceRecord::default();
        u1.cardkingdom.insert("2024-01-01".to_owned(), dec("1.00"));
        u1.cardkingdom.insert("2024-01-02".to_owned(), dec("1.50"));
        u1.tcgplayer.insert("2024-01-02".to_owned(), dec("2.00"));
        prices.insert(uuid(1), u1);

        let mut u2 = PriceRecord::default();
        u2.tcgplayer.insert("2024-01-02".to_owned(), dec("5.00"));
        prices.insert(uuid(2), u2);

        let mut catalog_map = BridgeIndex::default();
        catalog_map.insert(uuid(101), uuid(1));
        catalog_map.insert(uuid(102), uuid(2));

        let service = PriceService::new(PriceServiceConfig::default()).unwrap();
        service.install_snapshot(Snapshot {
            refreshed_at: None,
            prices: Arc::new(prices),
            catalog_map: Arc::new(catalog_map),
        });
        service
    }

    #[tokio::test]
    async fn price_by_printing_id_returns_latest_positive_price() {
        let service = service_with_fixture();
        assert_eq!(
            service.price_by_printing_id(&uuid(1), PriceSource::CardKingdom),
            Some(dec("1.50"))
        );
        assert_eq!(
            service.price_by_printing_id(&uuid(2), PriceSource::CardKingdom),
            None
        );
        assert_eq!(
            service.price_by_printing_id(&uuid(99), PriceSource::Tcgplayer),
            None
        );
    }

    #[tokio::test]
    async fn price_by_scryfall_id_resolves_through_the_bridge() {
        let service = service_with_fixture();
        assert_eq!(
            service.price_by_scryfall_id(&uuid(101), PriceSource::CardKingdom),
            Some(dec("1.50"))
        );
        assert_eq!(
            service.price_by_scryfall_id(&uuid(999), PriceSource::CardKingdom),
            None
        );
    }

    #[tokio::test]
    async fn paired_lookup_matches_per_source_lookups() {
        let service = service_with_fixture();
        for catalog in [uuid(101), uuid(102), uuid(999)] {
            let pair = service.prices_by_scryfall_id(&catalog);
            for source in PriceSource::ALL {
                assert_eq!(
                    pair.get(source),
                    service.price_by_scryfall_id(&catalog, source),
                    "mismatch for {catalog} / {source}"
                );
            }
        }
    }

    #[tokio::test]
    async fn unbridged_catalog_id_yields_empty_pair() {
        let service = service_with_fixture();
        let pair = service.prices_by_scryfall_id(&uuid(999));
        assert_eq!(pair.cardkingdom, None);
        assert_eq!(pair.tcgplayer, None);
        assert_eq!(service.resolve_printing_id(&uuid(999)), None);
    }
}
