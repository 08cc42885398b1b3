//! Tickertape stock data provider.
//!
//! Tickertape keys everything by an internal security id (`sid`), so a fetch
//! is three calls: resolve the ticker through search, read the info/ratios
//! bundle, then read the live quote. Resolved ids are cached for a day.
//!
//! NSE only. Requests are paced to stay under the public API's burst limit.

mod models;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use urlencoding::encode;

use crate::cache::ResponseCache;
use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;
use crate::models::{Exchange, SearchResult, StockRecord};
use crate::provider::http::{self, browser_headers};
use crate::provider::{CooldownTracker, ProviderCapabilities, RequestPacer, StockDataProvider};

use models::{Envelope, LiveQuote, SearchData, SearchStock, StockInfoData};

const API_URL: &str = "https://api.tickertape.in";
const QUOTES_URL: &str = "https://quotes-api.tickertape.in";
const PROVIDER_ID: &str = "TICKERTAPE";
const PROVIDER_NAME: &str = "Tickertape";
const COOLDOWN: Duration = Duration::from_secs(15 * 60);

/// Tickertape reports market cap in crores.
const CRORE: f64 = 1e7;

/// Tickertape provider.
pub struct TickertapeProvider {
    client: Client,
    api_url: String,
    quotes_url: String,
    sids: ResponseCache<String>,
    pacer: RequestPacer,
    cooldown: CooldownTracker,
}

impl TickertapeProvider {
    pub fn new(config: &MarketDataConfig) -> Self {
        Self::with_base_urls(config, API_URL, QUOTES_URL)
    }

    /// Point the provider at other hosts (for a local stub).
    pub fn with_base_urls(
        config: &MarketDataConfig,
        api_url: impl Into<String>,
        quotes_url: impl Into<String>,
    ) -> Self {
        Self {
            client: http::build_client(
                browser_headers("https://www.tickertape.in/"),
                config.provider_timeout,
                false,
            ),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            quotes_url: quotes_url.into().trim_end_matches('/').to_string(),
            sids: ResponseCache::new(config.resolution_ttl),
            pacer: RequestPacer::new(PROVIDER_ID, 5, Duration::from_secs(1), 5),
            cooldown: CooldownTracker::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        subject: &str,
    ) -> Result<Envelope<T>, MarketDataError> {
        self.pacer.acquire().await;
        let response = http::send(PROVIDER_ID, subject, self.client.get(url)).await?;
        http::read_json(PROVIDER_ID, response).await
    }

    async fn search_raw(&self, query: &str) -> Result<Vec<SearchStock>, MarketDataError> {
        let url = format!("{}/search?text={}&types=stock", self.api_url, encode(query));
        let envelope: Envelope<SearchData> = self.get_json(&url, query).await?;
        Ok(envelope.data.map(|d| d.stocks).unwrap_or_default())
    }

    /// Map an NSE ticker to Tickertape's security id.
    async fn resolve_sid(&self, symbol: &str) -> Result<String, MarketDataError> {
        if let Some(sid) = self.sids.get(symbol) {
            return Ok(sid);
        }

        let stocks = self.search_raw(symbol).await?;
        let sid = pick_exact_match(symbol, &stocks)
            .and_then(SearchStock::security_id)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;

        debug!("Tickertape resolved {} -> {}", symbol, sid);
        self.sids.set_default(symbol, sid.clone());
        Ok(sid)
    }

    async fn fetch_info(&self, symbol: &str, sid: &str) -> Result<StockInfoData, MarketDataError> {
        let url = format!("{}/stocks/info/{}", self.api_url, encode(sid));
        let envelope: Envelope<StockInfoData> = self.get_json(&url, symbol).await?;
        match envelope.data {
            Some(data) if envelope.success => Ok(data),
            _ => Err(MarketDataError::SymbolNotFound(symbol.to_string())),
        }
    }

    /// The live quote is best effort; the info bundle alone is still a record.
    async fn fetch_quote(&self, symbol: &str, sid: &str) -> Option<LiveQuote> {
        let url = format!("{}/quotes?sids={}", self.quotes_url, encode(sid));
        match self.get_json::<Vec<LiveQuote>>(&url, symbol).await {
            Ok(envelope) => envelope
                .data
                .unwrap_or_default()
                .into_iter()
                .find(|q| q.sid.is_empty() || q.sid == sid),
            Err(e) => {
                if e.is_rate_limit() {
                    self.absorb_failure("quote", symbol, &e);
                } else {
                    warn!("Tickertape quote fetch failed for {}: {}", symbol, e);
                }
                None
            }
        }
    }
}

/// Exact ticker match first, then a Tickertape-flagged exact match whose
/// ticker, minus any `.NS`/`.BO` style suffix, is still the requested symbol.
fn pick_exact_match<'a>(symbol: &str, stocks: &'a [SearchStock]) -> Option<&'a SearchStock> {
    stocks
        .iter()
        .find(|s| s.ticker.eq_ignore_ascii_case(symbol))
        .or_else(|| {
            let flagged = stocks.iter().find(|s| {
                s.match_kind == "EXACT" && ticker_base(&s.ticker).eq_ignore_ascii_case(symbol)
            })?;
            debug!(
                "Tickertape: resolved {} through flagged match {}",
                symbol, flagged.ticker
            );
            Some(flagged)
        })
}

fn ticker_base(ticker: &str) -> &str {
    ticker.split('.').next().unwrap_or(ticker)
}

fn to_record(symbol: &str, info: StockInfoData, quote: Option<LiveQuote>) -> StockRecord {
    let mut record = StockRecord::new(PROVIDER_NAME, symbol, Exchange::Nse);

    let basic = &mut record.basic_info;
    basic.company_name = info.info.name;
    basic.sector = info.info.sector;
    basic.description = info.info.description;
    basic.isin = info.info.isin;
    basic.country = "India".to_string();

    let ratios = info.ratios;
    let valuation = &mut record.valuation;
    valuation.market_cap = ratios.market_cap.map(|cr| cr * CRORE);
    valuation.pe_ratio = ratios.pe;
    valuation.pb_ratio = ratios.pb;
    valuation.sector_pe = ratios.sector_pe;
    valuation.dividend_yield = ratios.div_yield;

    record.financials.roe = ratios.roe;
    record.per_share.eps = ratios.eps;
    record.price_info.fifty_two_week_high = ratios.high_52w;
    record.price_info.fifty_two_week_low = ratios.low_52w;

    if let Some(q) = quote {
        let price = &mut record.price_info;
        price.current_price = q.price;
        price.previous_close = q.close;
        price.open = q.open;
        price.day_high = q.high;
        price.day_low = q.low;
        price.change = q.change;
        price.change_percent = q.change_percent;
        price.volume = q.volume;
    }

    record
}

// ============================================================================
// StockDataProvider Implementation
// ============================================================================

#[async_trait]
impl StockDataProvider for TickertapeProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            exchanges: &[Exchange::Nse],
            supports_search: true,
            most_complete: false,
        }
    }

    fn cooldown(&self) -> &CooldownTracker {
        &self.cooldown
    }

    fn default_cooldown(&self) -> Duration {
        COOLDOWN
    }

    async fn fetch_record(
        &self,
        symbol: &str,
        exchange: Exchange,
    ) -> Result<Option<StockRecord>, MarketDataError> {
        if exchange != Exchange::Nse {
            return Ok(None);
        }
        let symbol = symbol.trim().to_uppercase();
        debug!("Fetching {} from Tickertape", symbol);

        let sid = self.resolve_sid(&symbol).await?;
        let info = self.fetch_info(&symbol, &sid).await?;
        let quote = self.fetch_quote(&symbol, &sid).await;
        Ok(Some(to_record(&symbol, info, quote)))
    }

    async fn search_symbols(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MarketDataError> {
        let stocks = self.search_raw(query).await?;
        Ok(stocks
            .into_iter()
            .filter(|s| !s.ticker.is_empty())
            .take(limit)
            .map(|s| SearchResult::new(s.ticker, s.name, Exchange::Nse.as_str()))
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
