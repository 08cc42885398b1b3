//! Stock data models
//!
//! This module contains the core data types shared by providers and the registry:
//! - `types` - Type aliases for common identifiers (ProviderId)
//! - `exchange` - Indian exchange codes (Exchange)
//! - `record` - The canonical stock record and its sections (StockRecord)
//! - `fundamentals` - Rows of the local fundamentals store (Fundamentals)
//! - `search` - Search result data (SearchResult)
//! - `status` - Provider cooldown status (ProviderStatus)

mod exchange;
mod fundamentals;
mod record;
mod search;
mod status;
mod types;

pub use exchange::{Exchange, ParseExchangeError};
pub use fundamentals::Fundamentals;
pub use record::{
    AnalystData, Announcement, BasicInfo, CorporateAction, Dividends, Financials, NewsItem,
    Ownership, PerShare, PriceHistory, PriceInfo, QuarterlyResult, ScreenerData, Shareholding,
    StockRecord, TradingInfo, Valuation,
};
pub use search::SearchResult;
pub use status::ProviderStatus;
pub use types::ProviderId;
