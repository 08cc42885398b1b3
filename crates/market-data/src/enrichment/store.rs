use crate::errors::MarketDataError;
use crate::models::{Fundamentals, SearchResult};

/// Read access to the local fundamentals store.
///
/// The registry consults it after the provider walk, and falls back to it for
/// search when no provider returns matches. Implementations may block: the
/// registry calls them from tokio's blocking pool.
pub trait FundamentalsStore: Send + Sync {
    /// Stored row for `symbol` (case-insensitive), if any.
    fn get_cached_fundamentals(&self, symbol: &str) -> Result<Option<Fundamentals>, MarketDataError>;

    /// Symbols whose ticker or company name matches `query`.
    fn search_fundamentals(
        &self,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<SearchResult>, MarketDataError> {
        Ok(Vec::new())
    }
}
