//! Permabullish Market Data Crate
//!
//! Multi-source stock data aggregation for NSE/BSE listed instruments.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Several unreliable, rate-limited upstream sources behind one trait
//! - Per-provider cooldowns after rate-limit signals
//! - A short-TTL response cache keyed by exchange and symbol
//! - Fill-only enrichment from the most-complete source and a local
//!   fundamentals store
//!
//! # Architecture
//!
//! ```text
//!                          +------------------+
//!  fetch_stock_data  ----> | ProviderRegistry | ----> ResponseCache (hit: return)
//!                          +------------------+
//!                                  |
//!                                  v  priority walk, cooldown/exchange skips
//!          +------------+------------+------------+---------------+
//!          | Tickertape | NSE India  |   Yahoo    | Alpha Vantage |
//!          +------------+------------+------------+---------------+
//!                                  |
//!                                  v  first non-empty record
//!                          +------------------+
//!                          |     Backfill     | <---- most-complete provider
//!                          +------------------+ <---- FundamentalsStore
//!                                  |
//!                                  v
//!                          Arc<StockRecord> (cached)
//! ```
//!
//! # Core Types
//!
//! - [`StockRecord`] - Canonical, section-shaped snapshot of one instrument
//! - [`StockDataProvider`] - Contract every upstream source implements
//! - [`CooldownTracker`] - Per-provider rate-limit cooldown
//! - [`ResponseCache`] - TTL key/value cache
//! - [`ProviderRegistry`] - Orchestrator exposing the public operations
//! - [`Backfill`] - Monotonic fill-only merge
//! - [`FundamentalsStore`] - Read access to locally scraped fundamentals

pub mod cache;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use cache::{cache_key, ResponseCache, DEFAULT_RESOLUTION_TTL, DEFAULT_STOCK_TTL};
pub use config::{MarketDataConfig, DEFAULT_PROVIDER_TIMEOUT};
pub use enrichment::{Backfill, FundamentalsStore};
pub use errors::{FailureKind, MarketDataError};

pub use models::{
    Exchange, Fundamentals, ParseExchangeError, ProviderId, ProviderStatus, SearchResult,
    StockRecord,
};

pub use provider::{
    build_default_providers, AlphaVantageProvider, CooldownTracker, NseIndiaProvider,
    ProviderCapabilities, RequestPacer, StockDataProvider, TickertapeProvider, YahooProvider,
};

pub use registry::{
    AttemptOutcome, FetchDiagnostics, FetchOutcome, ProviderAttempt, ProviderRegistry, SkipReason,
    LOCAL_FUNDAMENTALS_SOURCE,
};
