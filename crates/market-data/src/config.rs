//! Library configuration.

use std::time::Duration;

use crate::cache::{DEFAULT_RESOLUTION_TTL, DEFAULT_STOCK_TTL};

/// Default per-call timeout for upstream requests.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Settings shared by the registry and the providers it builds.
#[derive(Clone, Debug)]
pub struct MarketDataConfig {
    /// How long a merged stock record stays cached.
    pub stock_ttl: Duration,
    /// How long a provider remembers a symbol resolution.
    pub resolution_ttl: Duration,
    /// Upper bound for one provider call (HTTP client timeout and registry guard).
    pub provider_timeout: Duration,
    /// Alpha Vantage is only enabled when a key is present.
    pub alpha_vantage_api_key: Option<String>,
    /// Backfill the primary record from the most-complete provider.
    pub enrich_from_most_complete: bool,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            stock_ttl: DEFAULT_STOCK_TTL,
            resolution_ttl: DEFAULT_RESOLUTION_TTL,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            alpha_vantage_api_key: None,
            enrich_from_most_complete: true,
        }
    }
}

impl MarketDataConfig {
    /// Set the Alpha Vantage key. Blank keys leave the provider disabled.
    pub fn with_alpha_vantage_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.alpha_vantage_api_key = if key.trim().is_empty() {
            None
        } else {
            Some(key.trim().to_string())
        };
        self
    }

    pub fn with_stock_ttl(mut self, ttl: Duration) -> Self {
        self.stock_ttl = ttl;
        self
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }
}
