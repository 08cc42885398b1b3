//! Stock data provider trait definitions.
//!
//! This module defines the core `StockDataProvider` trait that every
//! upstream source implements.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};

use crate::errors::{FailureKind, MarketDataError};
use crate::models::{Exchange, ProviderStatus, SearchResult, StockRecord};

use super::capabilities::ProviderCapabilities;
use super::cooldown::CooldownTracker;

/// Trait for stock data providers.
///
/// Implementors supply the fallible [`fetch_record`](Self::fetch_record) and,
/// optionally, [`search_symbols`](Self::search_symbols). The provided
/// [`fetch`](Self::fetch) and [`search`](Self::search) wrap them with the
/// never-fail contract: errors are logged, rate-limit signals start the
/// provider's cooldown, and the caller only sees `None` or an empty list.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use permabullish_market_data::provider::{CooldownTracker, ProviderCapabilities, StockDataProvider};
///
/// struct MyProvider {
///     cooldown: CooldownTracker,
/// }
///
/// #[async_trait]
/// impl StockDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn name(&self) -> &'static str {
///         "My Provider"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             exchanges: &[Exchange::Nse],
///             supports_search: false,
///             most_complete: false,
///         }
///     }
///
///     fn cooldown(&self) -> &CooldownTracker {
///         &self.cooldown
///     }
///
///     fn default_cooldown(&self) -> Duration {
///         Duration::from_secs(30 * 60)
///     }
///
///     // ... implement fetch_record
/// }
/// ```
#[async_trait]
pub trait StockDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// A constant string like "YAHOO" or "NSE_INDIA". Used for logging and
    /// diagnostics.
    fn id(&self) -> &'static str;

    /// Human-readable name, stamped into [`StockRecord::provider`].
    fn name(&self) -> &'static str;

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// This provider's cooldown state.
    fn cooldown(&self) -> &CooldownTracker;

    /// How long to stay out of rotation after a rate-limit signal.
    fn default_cooldown(&self) -> Duration;

    /// Fetch one instrument.
    ///
    /// `Ok(None)` means the provider answered but had nothing usable.
    async fn fetch_record(
        &self,
        symbol: &str,
        exchange: Exchange,
    ) -> Result<Option<StockRecord>, MarketDataError>;

    /// Search by ticker or company name.
    ///
    /// Default implementation returns `NotSupported`.
    async fn search_symbols(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MarketDataError> {
        let _ = (query, limit);
        Err(MarketDataError::NotSupported {
            operation: "search".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Fetch one instrument, absorbing every failure.
    ///
    /// Records without any data (identity only) are reported as `None`.
    async fn fetch(&self, symbol: &str, exchange: Exchange) -> Option<StockRecord> {
        match self.fetch_record(symbol, exchange).await {
            Ok(Some(record)) if record.has_data() => Some(record),
            Ok(_) => {
                debug!("{}: no data for {}:{}", self.id(), exchange, symbol);
                None
            }
            Err(e) => {
                self.absorb_failure("fetch", symbol, &e);
                None
            }
        }
    }

    /// Search, absorbing every failure. At most `limit` results.
    async fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        match self.search_symbols(query, limit).await {
            Ok(mut results) => {
                results.truncate(limit);
                results
            }
            Err(MarketDataError::NotSupported { .. }) => Vec::new(),
            Err(e) => {
                self.absorb_failure("search", query, &e);
                Vec::new()
            }
        }
    }

    /// False while a cooldown is active.
    fn is_available(&self) -> bool {
        self.cooldown().is_available()
    }

    /// Take the provider out of rotation for `duration`.
    fn mark_rate_limited(&self, duration: Duration) {
        let until = self.cooldown().mark_rate_limited(duration);
        warn!(
            "{} rate limited, cooling down for {} min (until {})",
            self.name(),
            duration.as_secs() / 60,
            until.format("%H:%M:%S UTC")
        );
    }

    /// Classify and log an error, starting a cooldown on rate-limit signals.
    fn absorb_failure(&self, operation: &str, subject: &str, error: &MarketDataError) -> FailureKind {
        let kind = error.failure_kind();
        match kind {
            FailureKind::RateLimited => self.mark_rate_limited(self.default_cooldown()),
            FailureKind::NotFound => {
                debug!("{} {} '{}': {}", self.id(), operation, subject, error)
            }
            FailureKind::Transient => {
                warn!("{} {} '{}' failed: {}", self.id(), operation, subject, error)
            }
        }
        kind
    }

    /// Operational view of the cooldown state.
    fn status(&self) -> ProviderStatus {
        let cooldown_expiry = self.cooldown().cooldown_expiry();
        ProviderStatus {
            id: self.id().to_string(),
            name: self.name().to_string(),
            available: self.is_available(),
            rate_limited: cooldown_expiry.is_some(),
            cooldown_expiry,
        }
    }
}
