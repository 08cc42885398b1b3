//! Stock data provider abstractions and implementations.
//!
//! This module contains:
//! - The `StockDataProvider` trait that all providers implement
//! - Provider capabilities, cooldown tracking and request pacing
//! - Concrete providers, in their default priority order: Tickertape, NSE
//!   India, Yahoo Finance, Alpha Vantage
//!
//! Providers own their symbol resolution (Tickertape security ids, Yahoo
//! suffixes, Alpha Vantage prefixes). The registry only ever passes a plain
//! exchange ticker and an [`Exchange`](crate::models::Exchange).

mod capabilities;
mod cooldown;
pub(crate) mod http;
mod throttle;
mod traits;

pub mod alpha_vantage;
pub mod nse;
pub mod tickertape;
pub mod yahoo;

use std::sync::Arc;

use log::info;

use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;

// Re-exports
pub use capabilities::ProviderCapabilities;
pub use cooldown::CooldownTracker;
pub use throttle::RequestPacer;
pub use traits::StockDataProvider;

pub use alpha_vantage::AlphaVantageProvider;
pub use nse::NseIndiaProvider;
pub use tickertape::TickertapeProvider;
pub use yahoo::YahooProvider;

/// Build the live providers in priority order.
///
/// Alpha Vantage is appended only when an API key is configured.
pub async fn build_default_providers(
    config: &MarketDataConfig,
) -> Result<Vec<Arc<dyn StockDataProvider>>, MarketDataError> {
    let mut providers: Vec<Arc<dyn StockDataProvider>> = vec![
        Arc::new(TickertapeProvider::new(config)),
        Arc::new(NseIndiaProvider::new(config)),
        Arc::new(YahooProvider::new(config).await?),
    ];

    match &config.alpha_vantage_api_key {
        Some(key) => providers.push(Arc::new(AlphaVantageProvider::new(config, key.clone()))),
        None => info!("No Alpha Vantage API key configured, provider disabled"),
    }

    Ok(providers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_order_without_alpha_vantage() {
        let providers = build_default_providers(&MarketDataConfig::default())
            .await
            .unwrap();
        let ids: Vec<&str> = providers.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec!["TICKERTAPE", "NSE_INDIA", "YAHOO"]);
    }

    #[tokio::test]
    async fn test_alpha_vantage_added_with_key() {
        let config = MarketDataConfig::default().with_alpha_vantage_key("demo");
        let providers = build_default_providers(&config).await.unwrap();
        assert_eq!(providers.len(), 4);
        assert_eq!(providers[3].id(), "ALPHA_VANTAGE");

        let most_complete: Vec<&str> = providers
            .iter()
            .filter(|p| p.capabilities().most_complete)
            .map(|p| p.id())
            .collect();
        assert_eq!(most_complete, vec!["YAHOO"]);
    }
}
