//! What a stock data provider can serve.

use crate::models::Exchange;

/// Describes the capabilities of a stock data provider.
///
/// Used by the registry to skip providers that cannot serve a request
/// before spending a network call on them.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Exchanges this provider can quote.
    pub exchanges: &'static [Exchange],

    /// Whether the provider supports symbol/company search.
    pub supports_search: bool,

    /// Whether this provider's records are the most complete of the set.
    ///
    /// After the priority walk the registry backfills the winning record from
    /// the first such provider (unless it already is the winner).
    pub most_complete: bool,
}

impl ProviderCapabilities {
    /// True when the provider lists `exchange`.
    pub fn covers(&self, exchange: Exchange) -> bool {
        self.exchanges.contains(&exchange)
    }
}
