//! Provider registry for orchestrating stock data providers.
//!
//! The registry owns the provider list (in priority order), the response
//! cache and the optional local fundamentals store, and handles:
//! - Cache-first lookups
//! - Provider selection by exchange coverage and cooldown state
//! - Fallback to the next provider on failure, with per-call timeouts and
//!   panic isolation
//! - Enrichment from the most-complete provider and the fundamentals store
//! - Diagnostic tracking for debugging provider selection

use std::any::Any;
use std::borrow::Cow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use log::{debug, error, info, warn};

use super::{FetchDiagnostics, SkipReason};
use crate::cache::{cache_key, ResponseCache};
use crate::config::MarketDataConfig;
use crate::enrichment::FundamentalsStore;
use crate::errors::{FailureKind, MarketDataError};
use crate::models::{Exchange, ProviderId, ProviderStatus, SearchResult, StockRecord};
use crate::provider::{build_default_providers, StockDataProvider};

/// Name recorded in `enriched_by` when the fundamentals store filled a field.
pub const LOCAL_FUNDAMENTALS_SOURCE: &str = "Local fundamentals";

/// Result of a fetch that keeps "unknown symbol" apart from "sources degraded".
#[derive(Clone, Debug)]
pub enum FetchOutcome {
    /// A provider returned data (possibly enriched, possibly from cache).
    Found(Arc<StockRecord>),

    /// At least one provider answered and none had the instrument.
    NotFound,

    /// Every provider was skipped, failed, timed out or panicked.
    Unavailable,
}

impl FetchOutcome {
    pub fn into_record(self) -> Option<Arc<StockRecord>> {
        match self {
            FetchOutcome::Found(record) => Some(record),
            FetchOutcome::NotFound | FetchOutcome::Unavailable => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FetchOutcome::Found(_))
    }
}

/// Outcome of one guarded provider call.
enum FetchAttempt {
    Record(StockRecord),
    Empty,
    Failed(FailureKind, String),
}

/// Provider registry for orchestrating stock data fetching.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn StockDataProvider>>,
    store: Option<Arc<dyn FundamentalsStore>>,
    cache: ResponseCache<Arc<StockRecord>>,
    config: MarketDataConfig,
}

impl ProviderRegistry {
    /// Create a new provider registry.
    ///
    /// # Arguments
    ///
    /// * `providers` - Stock data providers, highest priority first
    /// * `config` - Cache TTL, per-call timeout and enrichment settings
    pub fn new(providers: Vec<Arc<dyn StockDataProvider>>, config: MarketDataConfig) -> Self {
        Self {
            providers,
            store: None,
            cache: ResponseCache::new(config.stock_ttl),
            config,
        }
    }

    /// Create a registry with the default live providers.
    pub async fn from_config(config: MarketDataConfig) -> Result<Self, MarketDataError> {
        let providers = build_default_providers(&config).await?;
        Ok(Self::new(providers, config))
    }

    /// Attach the local fundamentals store.
    pub fn with_store(mut self, store: Arc<dyn FundamentalsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn providers(&self) -> &[Arc<dyn StockDataProvider>] {
        &self.providers
    }

    // ========================================================================
    // Fetch
    // ========================================================================

    /// Fetch the canonical record for one instrument.
    ///
    /// Returns `None` both for unknown symbols and when every source is
    /// degraded; use [`fetch_stock_data_detailed`](Self::fetch_stock_data_detailed)
    /// to tell them apart.
    pub async fn fetch_stock_data(
        &self,
        symbol: &str,
        exchange: Exchange,
    ) -> Option<Arc<StockRecord>> {
        self.fetch_stock_data_detailed(symbol, exchange)
            .await
            .into_record()
    }

    /// Fetch the canonical record, distinguishing why nothing was found.
    pub async fn fetch_stock_data_detailed(&self, symbol: &str, exchange: Exchange) -> FetchOutcome {
        self.fetch_with_diagnostics(symbol, exchange).await.0
    }

    /// Fetch with the per-provider attempt log.
    ///
    /// 1. Return the cached record on a hit
    /// 2. Walk providers in priority order, skipping cooling-down providers
    ///    and providers that don't serve the exchange
    /// 3. The first non-empty record is primary
    /// 4. Backfill from the most-complete provider (unless it was primary)
    /// 5. Backfill from the local fundamentals store
    /// 6. Cache and return
    pub async fn fetch_with_diagnostics(
        &self,
        symbol: &str,
        exchange: Exchange,
    ) -> (FetchOutcome, FetchDiagnostics) {
        let mut diagnostics = FetchDiagnostics::new();
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return (FetchOutcome::NotFound, diagnostics);
        }

        let key = cache_key(&symbol, exchange);
        if let Some(record) = self.cache.get(&key) {
            debug!("Cache hit for {}", key);
            return (FetchOutcome::Found(record), diagnostics);
        }

        let mut primary = None;
        for provider in &self.providers {
            let provider_id: ProviderId = Cow::Borrowed(provider.id());

            if let Err(reason) = eligibility(provider.as_ref(), exchange) {
                debug!("Skipping provider '{}' for {}: {}", provider_id, key, reason);
                diagnostics.record_skip(provider_id, reason);
                continue;
            }

            match self.call_fetch(provider.as_ref(), &symbol, exchange).await {
                FetchAttempt::Record(record) => {
                    diagnostics.record_success(provider_id);
                    primary = Some((provider, record));
                    break;
                }
                FetchAttempt::Empty => diagnostics.record_empty(provider_id),
                FetchAttempt::Failed(kind, message) => {
                    diagnostics.record_error(provider_id, kind, message)
                }
            }
        }

        let Some((provider, mut record)) = primary else {
            let outcome = if diagnostics.answered_not_found() {
                FetchOutcome::NotFound
            } else {
                FetchOutcome::Unavailable
            };
            info!(
                "No data for {} ({:?}). Diagnostics: {}",
                key,
                outcome,
                diagnostics.summary()
            );
            return (outcome, diagnostics);
        };

        debug!("Primary record for {}. Diagnostics: {}", key, diagnostics.summary());

        self.enrich_from_most_complete(
            provider.as_ref(),
            &diagnostics,
            &mut record,
            &symbol,
            exchange,
        )
        .await;
        self.enrich_from_store(&mut record, &symbol).await;

        let record = Arc::new(record);
        self.cache.set_default(key, Arc::clone(&record));
        (FetchOutcome::Found(record), diagnostics)
    }

    /// Call one provider with the per-call timeout, absorbing errors and panics.
    async fn call_fetch(
        &self,
        provider: &dyn StockDataProvider,
        symbol: &str,
        exchange: Exchange,
    ) -> FetchAttempt {
        let timeout = self.config.provider_timeout;
        let guarded = AssertUnwindSafe(provider.fetch_record(symbol, exchange)).catch_unwind();

        match tokio::time::timeout(timeout, guarded).await {
            Err(_) => {
                warn!(
                    "Provider '{}' timed out after {:?} for {}",
                    provider.id(),
                    timeout,
                    symbol
                );
                FetchAttempt::Failed(FailureKind::Transient, "timed out".to_string())
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic.as_ref());
                error!(
                    "Provider '{}' panicked while fetching {}: {}",
                    provider.id(),
                    symbol,
                    message
                );
                FetchAttempt::Failed(FailureKind::Transient, format!("panicked: {}", message))
            }
            Ok(Ok(Err(e))) => {
                let kind = provider.absorb_failure("fetch", symbol, &e);
                FetchAttempt::Failed(kind, e.to_string())
            }
            Ok(Ok(Ok(Some(record)))) if record.has_data() => FetchAttempt::Record(record),
            Ok(Ok(Ok(_))) => FetchAttempt::Empty,
        }
    }

    // ========================================================================
    // Enrichment
    // ========================================================================

    /// One pass from the most-complete provider, unless the walk already
    /// called it for this symbol.
    async fn enrich_from_most_complete(
        &self,
        primary: &dyn StockDataProvider,
        walk: &FetchDiagnostics,
        record: &mut StockRecord,
        symbol: &str,
        exchange: Exchange,
    ) {
        if !self.config.enrich_from_most_complete || primary.capabilities().most_complete {
            return;
        }
        let Some(source) = self
            .providers
            .iter()
            .find(|p| p.capabilities().most_complete && p.id() != primary.id())
        else {
            return;
        };
        if walk.was_called(source.id()) {
            debug!(
                "Skipping enrichment from '{}': already consulted for {}",
                source.id(),
                symbol
            );
            return;
        }
        if let Err(reason) = eligibility(source.as_ref(), exchange) {
            debug!("Skipping enrichment from '{}': {}", source.id(), reason);
            return;
        }

        match self.call_fetch(source.as_ref(), symbol, exchange).await {
            FetchAttempt::Record(secondary) => {
                if record.merge_from(source.name(), &secondary) {
                    debug!("Enriched {} from '{}'", symbol, source.id());
                }
            }
            FetchAttempt::Empty | FetchAttempt::Failed(..) => {
                debug!("No enrichment from '{}' for {}", source.id(), symbol)
            }
        }
    }

    /// Store lookups are blocking database reads, so they run on the blocking pool.
    async fn enrich_from_store(&self, record: &mut StockRecord, symbol: &str) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let key = symbol.to_string();
        let lookup =
            tokio::task::spawn_blocking(move || store.get_cached_fundamentals(&key)).await;
        match lookup {
            Ok(Ok(Some(fundamentals))) => {
                if record.merge_from(LOCAL_FUNDAMENTALS_SOURCE, &fundamentals.to_record()) {
                    debug!("Enriched {} from local fundamentals", symbol);
                }
            }
            Ok(Ok(None)) => debug!("No local fundamentals for {}", symbol),
            Ok(Err(e)) => warn!("Fundamentals lookup failed for {}: {}", symbol, e),
            Err(join_error) => error!(
                "Fundamentals lookup failed to complete for {}: {}",
                symbol,
                join_message(join_error)
            ),
        }
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Search by ticker or company name.
    ///
    /// Returns the first provider's non-empty result as is; results are not
    /// merged across providers. Falls back to the fundamentals store.
    pub async fn search_stocks(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut diagnostics = FetchDiagnostics::new();
        for provider in &self.providers {
            let provider_id: ProviderId = Cow::Borrowed(provider.id());

            if !provider.capabilities().supports_search {
                diagnostics.record_skip(provider_id, SkipReason::SearchNotSupported);
                continue;
            }
            if !provider.is_available() {
                diagnostics.record_skip(
                    provider_id,
                    SkipReason::CoolingDown {
                        until: provider.cooldown().cooldown_expiry(),
                    },
                );
                continue;
            }

            let guarded = AssertUnwindSafe(provider.search(query, limit)).catch_unwind();
            match tokio::time::timeout(self.config.provider_timeout, guarded).await {
                Ok(Ok(mut results)) if !results.is_empty() => {
                    diagnostics.record_success(provider_id);
                    debug!("Search '{}'. Diagnostics: {}", query, diagnostics.summary());
                    results.truncate(limit);
                    return results;
                }
                Ok(Ok(_)) => diagnostics.record_empty(provider_id),
                Ok(Err(panic)) => diagnostics.record_error(
                    provider_id,
                    FailureKind::Transient,
                    format!("panicked: {}", panic_message(panic.as_ref())),
                ),
                Err(_) => diagnostics.record_error(
                    provider_id,
                    FailureKind::Transient,
                    "timed out".to_string(),
                ),
            }
        }

        debug!(
            "No provider results for '{}'. Diagnostics: {}",
            query,
            diagnostics.summary()
        );

        let Some(store) = self.store.clone() else {
            return Vec::new();
        };
        let owned_query = query.to_string();
        let lookup =
            tokio::task::spawn_blocking(move || store.search_fundamentals(&owned_query, limit))
                .await;
        match lookup {
            Ok(Ok(mut results)) => {
                results.truncate(limit);
                results
            }
            Ok(Err(e)) => {
                warn!("Fundamentals search failed for '{}': {}", query, e);
                Vec::new()
            }
            Err(join_error) => {
                error!(
                    "Fundamentals search failed to complete for '{}': {}",
                    query,
                    join_message(join_error)
                );
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Cooldown state of every provider, in priority order.
    pub fn get_provider_status(&self) -> Vec<ProviderStatus> {
        self.providers.iter().map(|p| p.status()).collect()
    }

    /// Clear every provider's cooldown.
    pub fn reset_rate_limits(&self) {
        for provider in &self.providers {
            provider.cooldown().reset();
        }
        info!("Rate limits reset for {} providers", self.providers.len());
    }

    /// Drop every cached record.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// Whether `provider` may be asked for `exchange` right now.
fn eligibility(provider: &dyn StockDataProvider, exchange: Exchange) -> Result<(), SkipReason> {
    if !provider.capabilities().covers(exchange) {
        return Err(SkipReason::ExchangeNotCovered { exchange });
    }
    if !provider.is_available() {
        return Err(SkipReason::CoolingDown {
            until: provider.cooldown().cooldown_expiry(),
        });
    }
    Ok(())
}

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

fn join_message(join_error: tokio::task::JoinError) -> String {
    if join_error.is_panic() {
        panic_message(join_error.into_panic().as_ref())
    } else {
        join_error.to_string()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Fundamentals;
    use crate::provider::{CooldownTracker, ProviderCapabilities};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::thread::ThreadId;
    use std::time::Duration;

    #[derive(Clone)]
    enum Behavior {
        Record(StockRecord),
        Empty,
        NotFound,
        RateLimited,
        Fail,
        Hang,
        Panic,
    }

    struct MockProvider {
        id: &'static str,
        exchanges: &'static [Exchange],
        most_complete: bool,
        behavior: Behavior,
        search_results: Vec<SearchResult>,
        calls: AtomicUsize,
        searches: AtomicUsize,
        cooldown: CooldownTracker,
    }

    impl MockProvider {
        fn new(id: &'static str, behavior: Behavior) -> Self {
            Self {
                id,
                exchanges: Exchange::ALL,
                most_complete: false,
                behavior,
                search_results: Vec::new(),
                calls: AtomicUsize::new(0),
                searches: AtomicUsize::new(0),
                cooldown: CooldownTracker::new(),
            }
        }

        fn nse_only(mut self) -> Self {
            self.exchanges = &[Exchange::Nse];
            self
        }

        fn most_complete(mut self) -> Self {
            self.most_complete = true;
            self
        }

        fn with_search(mut self, results: Vec<SearchResult>) -> Self {
            self.search_results = results;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StockDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn name(&self) -> &'static str {
            self.id
        }

        fn capabilities(&self) -> ProviderCapabilities {
            ProviderCapabilities {
                exchanges: self.exchanges,
                supports_search: true,
                most_complete: self.most_complete,
            }
        }

        fn cooldown(&self) -> &CooldownTracker {
            &self.cooldown
        }

        fn default_cooldown(&self) -> Duration {
            Duration::from_secs(600)
        }

        async fn fetch_record(
            &self,
            _symbol: &str,
            _exchange: Exchange,
        ) -> Result<Option<StockRecord>, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Record(record) => Ok(Some(record.clone())),
                Behavior::Empty => Ok(None),
                Behavior::NotFound => Err(MarketDataError::SymbolNotFound("NOPE".to_string())),
                Behavior::RateLimited => Err(MarketDataError::RateLimited {
                    provider: self.id.to_string(),
                }),
                Behavior::Fail => Err(MarketDataError::ProviderError {
                    provider: self.id.to_string(),
                    message: "HTTP 503 Service Unavailable".to_string(),
                }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(None)
                }
                Behavior::Panic => panic!("mock provider bug"),
            }
        }

        async fn search_symbols(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<SearchResult>, MarketDataError> {
            self.searches.fetch_add(1, Ordering::SeqCst);
            Ok(self.search_results.clone())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        rows: HashMap<String, Fundamentals>,
        fail: bool,
        lookup_thread: Mutex<Option<ThreadId>>,
    }

    impl MemoryStore {
        fn with(fundamentals: Fundamentals) -> Self {
            let mut rows = HashMap::new();
            rows.insert(fundamentals.symbol.to_uppercase(), fundamentals);
            Self {
                rows,
                ..Default::default()
            }
        }
    }

    impl FundamentalsStore for MemoryStore {
        fn get_cached_fundamentals(
            &self,
            symbol: &str,
        ) -> Result<Option<Fundamentals>, MarketDataError> {
            *self.lookup_thread.lock().unwrap() = Some(std::thread::current().id());
            if self.fail {
                return Err(MarketDataError::Storage("database is locked".to_string()));
            }
            Ok(self.rows.get(symbol).cloned())
        }

        fn search_fundamentals(
            &self,
            query: &str,
            limit: usize,
        ) -> Result<Vec<SearchResult>, MarketDataError> {
            let query = query.to_uppercase();
            Ok(self
                .rows
                .values()
                .filter(|f| f.symbol.contains(&query))
                .take(limit)
                .map(|f| SearchResult::new(&f.symbol, f.company_name.clone().unwrap_or_default(), "NSE"))
                .collect())
        }
    }

    fn priced(provider: &str, symbol: &str, price: f64) -> StockRecord {
        let mut record = StockRecord::new(provider, symbol, Exchange::Nse);
        record.price_info.current_price = Some(price);
        record
    }

    fn registry(providers: Vec<Arc<MockProvider>>) -> ProviderRegistry {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn StockDataProvider>)
            .collect();
        ProviderRegistry::new(providers, MarketDataConfig::default())
    }

    #[tokio::test]
    async fn test_no_data_returns_none() {
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Empty));
        let p2 = Arc::new(MockProvider::new("P2", Behavior::Fail));
        let registry = registry(vec![p1.clone(), p2.clone()]);

        assert!(registry
            .fetch_stock_data("NOSUCH", Exchange::Nse)
            .await
            .is_none());
        assert_eq!(p1.calls(), 1);
        assert_eq!(p2.calls(), 1);
    }

    #[tokio::test]
    async fn test_identity_only_record_counts_as_empty() {
        let bare = StockRecord::new("P1", "NOSUCH", Exchange::Nse);
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Record(bare)));
        let registry = registry(vec![p1]);

        let (outcome, diagnostics) = registry.fetch_with_diagnostics("NOSUCH", Exchange::Nse).await;
        assert!(matches!(outcome, FetchOutcome::NotFound));
        assert_eq!(diagnostics.summary(), "P1: EMPTY");
    }

    #[tokio::test]
    async fn test_not_found_vs_unavailable() {
        let registry_a = registry(vec![
            Arc::new(MockProvider::new("P1", Behavior::Fail)),
            Arc::new(MockProvider::new("P2", Behavior::NotFound)),
        ]);
        assert!(matches!(
            registry_a.fetch_stock_data_detailed("NOPE", Exchange::Nse).await,
            FetchOutcome::NotFound
        ));

        let registry_b = registry(vec![
            Arc::new(MockProvider::new("P1", Behavior::Fail)),
            Arc::new(MockProvider::new("P2", Behavior::RateLimited)),
        ]);
        assert!(matches!(
            registry_b.fetch_stock_data_detailed("RELIANCE", Exchange::Nse).await,
            FetchOutcome::Unavailable
        ));
    }

    #[tokio::test]
    async fn test_cache_serves_second_call() {
        let p1 = Arc::new(MockProvider::new(
            "P1",
            Behavior::Record(priced("P1", "TCS", 3900.0)),
        ));
        let registry = registry(vec![p1.clone()]);

        let first = registry.fetch_stock_data("TCS", Exchange::Nse).await.unwrap();
        let second = registry.fetch_stock_data(" tcs ", Exchange::Nse).await.unwrap();

        assert_eq!(p1.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[tokio::test]
    async fn test_cache_is_per_exchange() {
        let p1 = Arc::new(MockProvider::new(
            "P1",
            Behavior::Record(priced("P1", "TCS", 3900.0)),
        ));
        let registry = registry(vec![p1.clone()]);

        registry.fetch_stock_data("TCS", Exchange::Nse).await.unwrap();
        registry.fetch_stock_data("TCS", Exchange::Bse).await.unwrap();
        assert_eq!(p1.calls(), 2);

        registry.clear_cache();
        registry.fetch_stock_data("TCS", Exchange::Nse).await.unwrap();
        assert_eq!(p1.calls(), 3);
    }

    #[tokio::test]
    async fn test_fallback_skips_cooling_down_provider() {
        let p1 = Arc::new(MockProvider::new(
            "P1",
            Behavior::Record(priced("P1", "INFY", 1.0)),
        ));
        let p2 = Arc::new(MockProvider::new(
            "P2",
            Behavior::Record(priced("P2", "INFY", 1850.0)),
        ));
        let p3 = Arc::new(MockProvider::new(
            "P3",
            Behavior::Record(priced("P3", "INFY", 3.0)),
        ));
        p1.mark_rate_limited(Duration::from_secs(600));
        let registry = registry(vec![p1.clone(), p2.clone(), p3.clone()]);

        let (outcome, diagnostics) = registry.fetch_with_diagnostics("INFY", Exchange::Nse).await;
        let record = outcome.into_record().unwrap();

        assert_eq!(record.provider, "P2");
        assert_eq!(record.price_info.current_price, Some(1850.0));
        assert_eq!(p1.calls(), 0);
        assert_eq!(p3.calls(), 0);
        assert_eq!(diagnostics.summary(), "P1: SKIPPED (CoolingDown) -> P2: SUCCESS");
    }

    #[tokio::test]
    async fn test_rate_limited_provider_cools_down() {
        let p1 = Arc::new(MockProvider::new("P1", Behavior::RateLimited));
        let p2 = Arc::new(MockProvider::new(
            "P2",
            Behavior::Record(priced("P2", "SBIN", 780.0)),
        ));
        let registry = registry(vec![p1.clone(), p2.clone()]);

        let record = registry.fetch_stock_data("SBIN", Exchange::Nse).await.unwrap();
        assert_eq!(record.provider, "P2");
        assert!(!p1.is_available());

        registry.fetch_stock_data("HDFCBANK", Exchange::Nse).await.unwrap();
        assert_eq!(p1.calls(), 1);

        let status = registry.get_provider_status();
        assert!(status[0].rate_limited);
        assert!(status[0].cooldown_expiry.is_some());
        assert!(!status[1].rate_limited);

        registry.reset_rate_limits();
        assert!(p1.is_available());
        assert!(registry.get_provider_status()[0].cooldown_expiry.is_none());
    }

    #[tokio::test]
    async fn test_transient_failure_does_not_cool_down() {
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Fail));
        let registry = registry(vec![p1.clone()]);
        registry.fetch_stock_data("SBIN", Exchange::Nse).await;
        assert!(p1.is_available());
    }

    #[tokio::test]
    async fn test_exchange_not_covered_is_skipped() {
        let nse = Arc::new(MockProvider::new("NSE", Behavior::Record(priced("NSE", "ITC", 1.0))).nse_only());
        let any = Arc::new(MockProvider::new(
            "ANY",
            Behavior::Record(priced("ANY", "ITC", 430.0)),
        ));
        let registry = registry(vec![nse.clone(), any]);

        let (outcome, diagnostics) = registry.fetch_with_diagnostics("ITC", Exchange::Bse).await;
        assert_eq!(outcome.into_record().unwrap().provider, "ANY");
        assert_eq!(nse.calls(), 0);
        assert_eq!(
            diagnostics.skip_reasons()[0].1,
            &SkipReason::ExchangeNotCovered {
                exchange: Exchange::Bse
            }
        );
    }

    #[tokio::test]
    async fn test_panicking_provider_is_absorbed() {
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Panic));
        let p2 = Arc::new(MockProvider::new(
            "P2",
            Behavior::Record(priced("P2", "WIPRO", 300.0)),
        ));
        let registry = registry(vec![p1.clone(), p2]);

        let (outcome, diagnostics) = registry.fetch_with_diagnostics("WIPRO", Exchange::Nse).await;
        assert_eq!(outcome.into_record().unwrap().provider, "P2");
        assert!(diagnostics.errors()[0].1.contains("mock provider bug"));
        assert!(p1.is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_providers_time_out_within_budget() {
        let providers: Vec<Arc<dyn StockDataProvider>> = vec![
            Arc::new(MockProvider::new("P1", Behavior::Hang)),
            Arc::new(MockProvider::new("P2", Behavior::Hang)),
            Arc::new(MockProvider::new("P3", Behavior::Hang)),
        ];
        let config = MarketDataConfig::default().with_provider_timeout(Duration::from_secs(5));
        let registry = ProviderRegistry::new(providers, config);

        let started = tokio::time::Instant::now();
        let outcome = registry.fetch_stock_data_detailed("RELIANCE", Exchange::Nse).await;

        assert!(matches!(outcome, FetchOutcome::Unavailable));
        assert!(started.elapsed() <= Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_enrichment_from_most_complete_provider() {
        let mut primary = priced("Tickertape", "RELIANCE", 1400.0);
        primary.valuation.pe_ratio = Some(24.1);

        let mut complete = priced("Yahoo", "RELIANCE", 1399.0);
        complete.valuation.pe_ratio = Some(30.0);
        complete.valuation.forward_pe = Some(21.3);
        complete.price_history.dates = vec!["2025-01-20".to_string()];
        complete.price_history.prices = vec![1399.0];

        let p1 = Arc::new(MockProvider::new("Tickertape", Behavior::Record(primary)));
        let yahoo = Arc::new(MockProvider::new("Yahoo", Behavior::Record(complete)).most_complete());
        let registry = registry(vec![p1, yahoo.clone()]);

        let record = registry.fetch_stock_data("RELIANCE", Exchange::Nse).await.unwrap();
        assert_eq!(record.provider, "Tickertape");
        assert_eq!(record.price_info.current_price, Some(1400.0));
        assert_eq!(record.valuation.pe_ratio, Some(24.1));
        assert_eq!(record.valuation.forward_pe, Some(21.3));
        assert_eq!(record.price_history.prices, vec![1399.0]);
        assert_eq!(record.enriched_by, vec!["Yahoo"]);
        assert_eq!(yahoo.calls(), 1);
    }

    #[tokio::test]
    async fn test_most_complete_primary_is_not_refetched() {
        let yahoo = Arc::new(
            MockProvider::new("Yahoo", Behavior::Record(priced("Yahoo", "TCS", 3900.0)))
                .most_complete(),
        );
        let registry = registry(vec![yahoo.clone()]);

        registry.fetch_stock_data("TCS", Exchange::Nse).await.unwrap();
        assert_eq!(yahoo.calls(), 1);
    }

    #[tokio::test]
    async fn test_enrichment_skips_cooling_down_source() {
        let p1 = Arc::new(MockProvider::new(
            "P1",
            Behavior::Record(priced("P1", "TCS", 3900.0)),
        ));
        let yahoo = Arc::new(MockProvider::new("Yahoo", Behavior::Fail).most_complete());
        yahoo.mark_rate_limited(Duration::from_secs(600));
        let registry = registry(vec![p1, yahoo.clone()]);

        let record = registry.fetch_stock_data("TCS", Exchange::Nse).await.unwrap();
        assert_eq!(record.provider, "P1");
        assert!(record.enriched_by.is_empty());
        assert_eq!(yahoo.calls(), 0);
    }

    #[tokio::test]
    async fn test_enrichment_does_not_recall_most_complete_source() {
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Empty));
        let yahoo = Arc::new(MockProvider::new("Yahoo", Behavior::Fail).most_complete());
        let p3 = Arc::new(MockProvider::new(
            "P3",
            Behavior::Record(priced("P3", "TCS", 3900.0)),
        ));
        let registry = registry(vec![p1, yahoo.clone(), p3]);

        let (outcome, diagnostics) = registry.fetch_with_diagnostics("TCS", Exchange::Nse).await;
        let record = outcome.into_record().unwrap();
        assert_eq!(record.provider, "P3");
        assert!(record.enriched_by.is_empty());
        assert_eq!(yahoo.calls(), 1);
        assert!(diagnostics.summary().starts_with("P1: EMPTY -> Yahoo: ERROR"));
        assert!(diagnostics.summary().ends_with("P3: SUCCESS"));
    }

    #[tokio::test]
    async fn test_enrichment_does_not_recall_empty_most_complete_source() {
        let yahoo = Arc::new(MockProvider::new("Yahoo", Behavior::Empty).most_complete());
        let p2 = Arc::new(MockProvider::new(
            "P2",
            Behavior::Record(priced("P2", "TCS", 3900.0)),
        ));
        let registry = registry(vec![yahoo.clone(), p2]);

        registry.fetch_stock_data("TCS", Exchange::Nse).await.unwrap();
        assert_eq!(yahoo.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_lookup_runs_off_the_runtime_thread() {
        let p1 = Arc::new(MockProvider::new(
            "P1",
            Behavior::Record(priced("P1", "INFY", 1850.0)),
        ));
        let store = Arc::new(MemoryStore::with(Fundamentals {
            symbol: "INFY".to_string(),
            pe_ratio: Some(27.0),
            ..Default::default()
        }));
        let registry = registry(vec![p1]).with_store(store.clone());

        let record = registry.fetch_stock_data("INFY", Exchange::Nse).await.unwrap();
        assert_eq!(record.valuation.pe_ratio, Some(27.0));

        let lookup_thread = store.lookup_thread.lock().unwrap().expect("store was consulted");
        assert_ne!(lookup_thread, std::thread::current().id());
    }

    #[tokio::test]
    async fn test_enrichment_completeness_from_store() {
        let mut primary = priced("P1", "INFY", 1850.0);
        primary.valuation.pe_ratio = Some(27.0);
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Record(primary)));

        let store = MemoryStore::with(Fundamentals {
            symbol: "INFY".to_string(),
            quarterly_results: vec![json!({"period": "Dec 2024", "sales": 41764})],
            ..Default::default()
        });
        let registry = registry(vec![p1]).with_store(Arc::new(store));

        let record = registry.fetch_stock_data("infy", Exchange::Nse).await.unwrap();
        assert_eq!(record.price_info.current_price, Some(1850.0));
        assert_eq!(record.valuation.pe_ratio, Some(27.0));
        assert_eq!(record.screener_data.quarterly_results.len(), 1);
        assert_eq!(record.provider, "P1");
        assert_eq!(record.enriched_by, vec![LOCAL_FUNDAMENTALS_SOURCE]);
    }

    #[tokio::test]
    async fn test_reliance_scenario() {
        let mut primary = priced("Tickertape", "RELIANCE", 1400.0);
        primary.valuation.pe_ratio = Some(0.0);
        let p1 = Arc::new(MockProvider::new("Tickertape", Behavior::Record(primary)));

        let store = MemoryStore::with(Fundamentals {
            symbol: "RELIANCE".to_string(),
            pe_ratio: Some(24.5),
            pros: vec!["Strong cash flows".to_string()],
            ..Default::default()
        });
        let registry = registry(vec![p1]).with_store(Arc::new(store));

        let record = registry
            .fetch_stock_data("RELIANCE", Exchange::Nse)
            .await
            .unwrap();
        assert_eq!(record.price_info.current_price, Some(1400.0));
        assert_eq!(record.valuation.pe_ratio, Some(24.5));
        assert_eq!(record.screener_data.pros, vec!["Strong cash flows"]);
        assert_eq!(record.provider, "Tickertape");
    }

    #[tokio::test]
    async fn test_store_failure_is_treated_as_no_fundamentals() {
        let p1 = Arc::new(MockProvider::new(
            "P1",
            Behavior::Record(priced("P1", "TCS", 3900.0)),
        ));
        let store = MemoryStore {
            fail: true,
            ..Default::default()
        };
        let registry = registry(vec![p1]).with_store(Arc::new(store));

        let record = registry.fetch_stock_data("TCS", Exchange::Nse).await.unwrap();
        assert_eq!(record.price_info.current_price, Some(3900.0));
        assert!(record.enriched_by.is_empty());
    }

    #[tokio::test]
    async fn test_store_does_not_answer_without_provider_record() {
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Empty));
        let store = MemoryStore::with(Fundamentals {
            symbol: "TCS".to_string(),
            current_price: Some(3900.0),
            quarterly_results: vec![json!({"period": "Dec 2024", "sales": 63973})],
            ..Default::default()
        });
        let registry = registry(vec![p1]).with_store(Arc::new(store));

        assert!(registry.fetch_stock_data("TCS", Exchange::Nse).await.is_none());
    }

    #[tokio::test]
    async fn test_search_returns_first_non_empty_result() {
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Empty));
        let p2 = Arc::new(
            MockProvider::new("P2", Behavior::Empty)
                .with_search(vec![SearchResult::new("TCS", "Tata Consultancy Services", "NSE")]),
        );
        let p3 = Arc::new(
            MockProvider::new("P3", Behavior::Empty)
                .with_search(vec![SearchResult::new("TCS", "TCS Ltd", "BSE")]),
        );
        let registry = registry(vec![p1.clone(), p2, p3.clone()]);

        let results = registry.search_stocks("tcs", 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Tata Consultancy Services");
        assert_eq!(p1.searches.load(Ordering::SeqCst), 1);
        assert_eq!(p3.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_skips_cooling_down_and_respects_limit() {
        let results: Vec<SearchResult> = (0..5)
            .map(|i| SearchResult::new(format!("SYM{}", i), "Name", "NSE"))
            .collect();
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Empty).with_search(results.clone()));
        let p2 = Arc::new(MockProvider::new("P2", Behavior::Empty).with_search(results));
        p1.mark_rate_limited(Duration::from_secs(600));
        let registry = registry(vec![p1.clone(), p2]);

        assert_eq!(registry.search_stocks("sym", 3).await.len(), 3);
        assert_eq!(p1.searches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_falls_back_to_store() {
        let p1 = Arc::new(MockProvider::new("P1", Behavior::Empty));
        let store = MemoryStore::with(Fundamentals {
            symbol: "HDFCBANK".to_string(),
            company_name: Some("HDFC Bank Ltd".to_string()),
            ..Default::default()
        });
        let registry = registry(vec![p1]).with_store(Arc::new(store));

        let results = registry.search_stocks("hdfc", 10).await;
        assert_eq!(results, vec![SearchResult::new("HDFCBANK", "HDFC Bank Ltd", "NSE")]);
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let p1 = Arc::new(
            MockProvider::new("P1", Behavior::Empty)
                .with_search(vec![SearchResult::new("TCS", "TCS", "NSE")]),
        );
        let registry = registry(vec![p1.clone()]);

        assert!(registry.search_stocks("   ", 10).await.is_empty());
        assert!(registry.search_stocks("tcs", 0).await.is_empty());
        assert_eq!(p1.searches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
