//! Search result models for symbol lookup.

use serde::{Deserialize, Serialize};

/// Result from a ticker/company search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Exchange ticker without any provider suffix (e.g., "RELIANCE")
    pub symbol: String,

    /// Display name (e.g., "Reliance Industries Ltd")
    pub name: String,

    /// Exchange code ("NSE" or "BSE")
    pub exchange: String,
}

impl SearchResult {
    /// Create a new search result.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            exchange: exchange.into(),
        }
    }
}
