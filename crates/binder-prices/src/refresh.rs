//! Refresh coordination: the single writer that builds and publishes indices.
//!
//! The service owns both indices behind one `ArcSwap`. Readers load the
//! snapshot without locking; only `refresh()` stores, and it publishes the
//! price and bridge indices together so a reader can never observe a bridge
//! entry pointing at an unpriced printing.
//!
//! The two upstream documents are independent, and a partial outage must not
//! wipe the cache: each step that fails preserves its previous index, and
//! the refresh timestamp advances only when the price document itself was
//! rebuilt (it is what the freshness check governs).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::cache;
use crate::error::PriceError;
use crate::fetch::{chunk_channel, DocumentFetcher};
use crate::index::{
    build_bridge_index, build_price_index, BridgeIndex, BuildStats, PriceIndex, Snapshot,
};

/// Typed configuration for [`PriceService`].
#[derive(Debug, Clone)]
pub struct PriceServiceConfig {
    pub price_url: String,
    pub identifier_url: String,
    pub cache_path: PathBuf,
    pub cache_ttl: Duration,
    pub price_fetch_timeout: Duration,
    /// The identifier document is materially larger than the price document
    /// and gets its own, longer deadline.
    pub identifier_fetch_timeout: Duration,
    pub progress_interval: usize,
    pub user_agent: String,
}

impl PriceServiceConfig {
    /// Adapts the process-wide [`binder_core::AppConfig`].
    #[must_use]
    pub fn from_app_config(config: &binder_core::AppConfig) -> Self {
        Self {
            price_url: config.price_url.clone(),
            identifier_url: config.identifier_url.clone(),
            cache_path: config.cache_path.clone(),
            cache_ttl: Duration::from_millis(config.cache_ttl_millis),
            price_fetch_timeout: Duration::from_millis(config.price_fetch_timeout_millis),
            identifier_fetch_timeout: Duration::from_millis(
                config.identifier_fetch_timeout_millis,
            ),
            progress_interval: config.progress_interval,
            user_agent: config.user_agent.clone(),
        }
    }
}

impl Default for PriceServiceConfig {
    fn default() -> Self {
        Self {
            price_url: "https://mtgjson.com/api/v5/AllPricesToday.json".to_owned(),
            identifier_url: "https://mtgjson.com/api/v5/AllIdentifiers.json".to_owned(),
            cache_path: PathBuf::from("./data/price-cache.json"),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            price_fetch_timeout: Duration::from_secs(120),
            identifier_fetch_timeout: Duration::from_secs(300),
            progress_interval: 50_000,
            user_agent: "binder/0.1 (price-intelligence)".to_owned(),
        }
    }
}

/// Lifecycle state derived from index presence and refresh activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No indices and nothing in flight.
    Cold,
    /// First refresh in flight, nothing to serve yet.
    Refreshing,
    /// Serving an index while a refresh runs behind it.
    Warm,
    /// Serving an index, no refresh in flight.
    Ready,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceState::Cold => write!(f, "cold"),
            ServiceState::Refreshing => write!(f, "refreshing"),
            ServiceState::Warm => write!(f, "warm"),
            ServiceState::Ready => write!(f, "ready"),
        }
    }
}

/// Outcome of a [`PriceService::refresh`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Another refresh completed while this caller waited for the flight
    /// lock; its result stands and no second pair of fetches was issued.
    Coalesced,
    Completed(RefreshReport),
}

/// What one refresh pass actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Whether the price index was rebuilt from upstream (false = preserved).
    pub prices_rebuilt: bool,
    /// Whether the bridge index was rebuilt from upstream (false = preserved).
    pub bridge_rebuilt: bool,
    /// Printings in the published price index.
    pub price_count: usize,
    /// Mappings in the published bridge index.
    pub bridge_count: usize,
}

/// Process-wide price intelligence service.
///
/// Constructed once, injected into whatever needs prices. All lookup entry
/// points live in the `lookup` module; valuation in `valuation`.
pub struct PriceService {
    pub(crate) config: PriceServiceConfig,
    fetcher: DocumentFetcher,
    pub(crate) snapshot: ArcSwap<Snapshot>,
    refresh_lock: Mutex<()>,
    refresh_generation: AtomicU64,
    refreshing: AtomicBool,
}

impl PriceService {
    /// # Errors
    ///
    /// Returns [`PriceError::Http`] if the HTTP client cannot be built.
    pub fn new(config: PriceServiceConfig) -> Result<Arc<Self>, PriceError> {
        let fetcher = DocumentFetcher::new(&config.user_agent)?;
        Ok(Arc::new(Self {
            config,
            fetcher,
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
            refresh_lock: Mutex::new(()),
            refresh_generation: AtomicU64::new(0),
            refreshing: AtomicBool::new(false),
        }))
    }

    /// Loads the disk cache, once, at process start. A missing cache starts
    /// cold; a corrupt cache is logged and ignored. Never fails: the service
    /// is usable (if empty) regardless of what is on disk.
    pub async fn initialize(&self) {
        match cache::load(&self.config.cache_path).await {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    prices = snapshot.prices.len(),
                    bridge = snapshot.catalog_map.len(),
                    refreshed_at = ?snapshot.refreshed_at,
                    "loaded price cache from disk"
                );
                self.snapshot.store(Arc::new(snapshot));
            }
            Ok(None) => {
                tracing::info!(
                    path = %self.config.cache_path.display(),
                    "no price cache on disk; starting cold"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "price cache unreadable; starting cold");
            }
        }
    }

    /// The current published snapshot: a consistent index pair.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Ready as soon as the price index has any entries, stale or not;
    /// staleness is a separate health signal ([`Self::is_stale`]).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        !self.snapshot.load().prices.is_empty()
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.snapshot.load().is_stale(self.config.cache_ttl)
    }

    #[must_use]
    pub fn state(&self) -> ServiceState {
        match (self.is_ready(), self.refreshing.load(Ordering::Relaxed)) {
            (false, false) => ServiceState::Cold,
            (false, true) => ServiceState::Refreshing,
            (true, true) => ServiceState::Warm,
            (true, false) => ServiceState::Ready,
        }
    }

    /// Fire-and-forget refresh for embedding processes that found a stale
    /// cache at startup. Errors are log events only.
    pub fn spawn_refresh(self: &Arc<Self>) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.refresh().await;
        });
    }

    /// Runs one refresh pass. At most one pass runs at a time: callers that
    /// arrive while a pass is in flight wait for it and return
    /// [`RefreshOutcome::Coalesced`] without issuing a second pair of
    /// fetches.
    ///
    /// Infallible by design — the coordinator is the error boundary. A step
    /// that fails preserves its previous index and is reported through the
    /// [`RefreshReport`] flags.
    pub async fn refresh(&self) -> RefreshOutcome {
        let entered = self.refresh_generation.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;
        if self.refresh_generation.load(Ordering::Acquire) != entered {
            return RefreshOutcome::Coalesced;
        }

        self.refreshing.store(true, Ordering::Release);
        let report = self.run_refresh().await;
        self.refreshing.store(false, Ordering::Release);
        self.refresh_generation.fetch_add(1, Ordering::AcqRel);
        RefreshOutcome::Completed(report)
    }

    async fn run_refresh(&self) -> RefreshReport {
        let current = self.snapshot.load_full();

        let new_prices = match self.build_candidate_prices().await {
            Ok((index, stats)) => {
                tracing::info!(
                    kept = stats.kept,
                    total = stats.total,
                    malformed = stats.malformed,
                    "price document refreshed"
                );
                Some(Arc::new(index))
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "price document refresh failed; keeping previous price index"
                );
                None
            }
        };

        // The bridge build filters against whichever price index is
        // authoritative now: the fresh one when step 1 succeeded, the
        // previous one otherwise.
        let authoritative_prices = new_prices
            .clone()
            .unwrap_or_else(|| Arc::clone(&current.prices));

        let new_bridge = match self
            .build_candidate_bridge(Arc::clone(&authoritative_prices))
            .await
        {
            Ok((bridge, stats)) => {
                tracing::info!(
                    kept = stats.kept,
                    total = stats.total,
                    malformed = stats.malformed,
                    "identifier document refreshed"
                );
                Some(Arc::new(bridge))
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "identifier document refresh failed; keeping previous bridge index"
                );
                None
            }
        };

        let report = RefreshReport {
            prices_rebuilt: new_prices.is_some(),
            bridge_rebuilt: new_bridge.is_some(),
            price_count: authoritative_prices.len(),
            bridge_count: new_bridge
                .as_ref()
                .map_or(current.catalog_map.len(), |bridge| bridge.len()),
        };

        if report.prices_rebuilt || report.bridge_rebuilt {
            let next = Snapshot {
                refreshed_at: if report.prices_rebuilt {
                    Some(Utc::now())
                } else {
                    current.refreshed_at
                },
                prices: authoritative_prices,
                catalog_map: new_bridge.unwrap_or_else(|| Arc::clone(&current.catalog_map)),
            };
            self.snapshot.store(Arc::new(next));

            let published = self.snapshot.load_full();
            if let Err(err) = cache::store(&self.config.cache_path, &published).await {
                tracing::warn!(
                    error = %err,
                    "price cache persist failed; in-memory indices unaffected"
                );
            }
        }

        report
    }

    async fn build_candidate_prices(&self) -> Result<(PriceIndex, BuildStats), PriceError> {
        let stream = self
            .fetcher
            .open(&self.config.price_url, self.config.price_fetch_timeout)
            .await?;
        let (tx, reader) = chunk_channel();
        let producer = tokio::spawn(stream.pump(tx));
        let builder = tokio::task::spawn_blocking(move || build_price_index(reader));

        let (built, pumped) = tokio::join!(builder, producer);
        match built? {
            Ok(ok) => Ok(ok),
            // Prefer the transport error that truncated the stream over the
            // parse error it produced.
            Err(parse_err) => match pumped? {
                Err(fetch_err) => Err(fetch_err),
                Ok(()) => Err(parse_err),
            },
        }
    }

    async fn build_candidate_bridge(
        &self,
        prices: Arc<PriceIndex>,
    ) -> Result<(BridgeIndex, BuildStats), PriceError> {
        let stream = self
            .fetcher
            .open(
                &self.config.identifier_url,
                self.config.identifier_fetch_timeout,
            )
            .await?;
        let (tx, reader) = chunk_channel();
        let progress_interval = self.config.progress_interval;
        let producer = tokio::spawn(stream.pump(tx));
        let builder = tokio::task::spawn_blocking(move || {
            build_bridge_index(reader, &prices, progress_interval)
        });

        let (built, pumped) = tokio::join!(builder, producer);
        match built? {
            Ok(ok) => Ok(ok),
            Err(parse_err) => match pumped? {
                Err(fetch_err) => Err(fetch_err),
                Ok(()) => Err(parse_err),
            },
        }
    }

    /// Installs a snapshot directly, bypassing fetch and disk. Test-only.
    #[cfg(test)]
    pub(crate) fn install_snapshot(&self, snapshot: Snapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }
}
