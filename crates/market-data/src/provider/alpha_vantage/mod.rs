//! Alpha Vantage stock data provider.
//!
//! Last-resort source: `GLOBAL_QUOTE` gives a bare price snapshot with no
//! company name or fundamentals, and `SYMBOL_SEARCH` covers Indian listings
//! under the `NSE:` / `BSE:` prefixes.
//!
//! The free tier allows 5 calls per minute and 25 per day. Calls are paced
//! to the per-minute limit, and the daily budget is tracked locally so an
//! exhausted key never reaches the network.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;
use crate::models::{Exchange, SearchResult, StockRecord};
use crate::provider::http::{self, lenient_f64};
use crate::provider::{CooldownTracker, ProviderCapabilities, RequestPacer, StockDataProvider};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER_ID: &str = "ALPHA_VANTAGE";
const PROVIDER_NAME: &str = "Alpha Vantage";
const COOLDOWN: Duration = Duration::from_secs(60 * 60);

/// Free-tier calls per local calendar day.
const DAILY_LIMIT: u32 = 25;

// ============================================================================
// Response structures for Alpha Vantage API
// ============================================================================

/// GLOBAL_QUOTE response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: String,
    #[serde(rename = "02. open", deserialize_with = "lenient_f64")]
    open: Option<f64>,
    #[serde(rename = "03. high", deserialize_with = "lenient_f64")]
    high: Option<f64>,
    #[serde(rename = "04. low", deserialize_with = "lenient_f64")]
    low: Option<f64>,
    #[serde(rename = "05. price", deserialize_with = "lenient_f64")]
    price: Option<f64>,
    #[serde(rename = "06. volume", deserialize_with = "lenient_f64")]
    volume: Option<f64>,
    #[serde(rename = "08. previous close", deserialize_with = "lenient_f64")]
    previous_close: Option<f64>,
    #[serde(rename = "09. change", deserialize_with = "lenient_f64")]
    change: Option<f64>,
    #[serde(rename = "10. change percent", deserialize_with = "lenient_f64")]
    change_percent: Option<f64>,
}

/// SYMBOL_SEARCH response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SymbolSearchResponse {
    #[serde(rename = "bestMatches")]
    best_matches: Vec<SymbolMatch>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SymbolMatch {
    #[serde(rename = "1. symbol")]
    symbol: String,
    #[serde(rename = "2. name")]
    name: String,
    #[serde(rename = "4. region")]
    region: String,
}

// ============================================================================
// Daily quota
// ============================================================================

/// Calls made on the current local date.
#[derive(Debug)]
struct DailyQuota {
    limit: u32,
    used: Mutex<(NaiveDate, u32)>,
}

impl DailyQuota {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            used: Mutex::new((NaiveDate::MIN, 0)),
        }
    }

    fn try_acquire(&self) -> bool {
        self.try_acquire_on(Local::now().date_naive())
    }

    /// Take one call from `today`'s budget; the count resets when the date changes.
    fn try_acquire_on(&self, today: NaiveDate) -> bool {
        let mut used = self.used.lock().unwrap_or_else(|poisoned| {
            warn!("Alpha Vantage quota lock poisoned, recovering");
            poisoned.into_inner()
        });
        if used.0 != today {
            *used = (today, 0);
        }
        if used.1 >= self.limit {
            return false;
        }
        used.1 += 1;
        true
    }
}

// ============================================================================
// AlphaVantageProvider implementation
// ============================================================================

/// Alpha Vantage provider. Only constructed when an API key is configured.
pub struct AlphaVantageProvider {
    client: Client,
    base_url: String,
    api_key: String,
    quota: DailyQuota,
    pacer: RequestPacer,
    cooldown: CooldownTracker,
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
    pub fn new(config: &MarketDataConfig, api_key: String) -> Self {
        Self::with_base_url(config, api_key, BASE_URL)
    }

    pub fn with_base_url(
        config: &MarketDataConfig,
        api_key: String,
        base_url: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(config.provider_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into(),
            api_key,
            quota: DailyQuota::new(DAILY_LIMIT),
            pacer: RequestPacer::new(PROVIDER_ID, 5, Duration::from_secs(60), 5),
            cooldown: CooldownTracker::new(),
        }
    }

    /// Make a request to the Alpha Vantage API.
    async fn request(&self, params: &[(&str, &str)], subject: &str) -> Result<String, MarketDataError> {
        if !self.quota.try_acquire() {
            return Err(MarketDataError::QuotaExhausted {
                provider: PROVIDER_ID.to_string(),
            });
        }

        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(&self.base_url, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        self.pacer.acquire().await;
        let response = http::send(PROVIDER_ID, subject, self.client.get(url)).await?;
        response
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })
    }

    /// Check for API-level errors in the response.
    ///
    /// Alpha Vantage answers 200 for everything; throttling arrives as a
    /// "Note" or "Information" notice in the body.
    fn check_api_error(
        error_message: &Option<String>,
        note: &Option<String>,
        information: &Option<String>,
    ) -> Result<(), MarketDataError> {
        if let Some(ref msg) = error_message {
            if msg.contains("Invalid API call") || msg.contains("not found") {
                return Err(MarketDataError::SymbolNotFound(msg.clone()));
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: msg.clone(),
            });
        }

        for msg in [note, information].into_iter().flatten() {
            if msg.contains("API call frequency")
                || msg.contains("rate limit")
                || msg.contains("requests per day")
            {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            warn!("Alpha Vantage notice: {}", msg);
        }

        Ok(())
    }
}

/// Alpha Vantage addresses Indian listings as "NSE:SYM" / "BSE:SYM".
fn av_symbol(symbol: &str, exchange: Exchange) -> String {
    format!("{}:{}", exchange.as_str(), symbol.trim().to_uppercase())
}

fn quote_to_record(symbol: &str, exchange: Exchange, quote: GlobalQuote) -> Option<StockRecord> {
    if quote.symbol.is_empty() || quote.price.is_none() {
        return None;
    }
    let mut record = StockRecord::new(PROVIDER_NAME, symbol, exchange);
    // GLOBAL_QUOTE carries no company name.
    record.basic_info.company_name = symbol.to_string();

    let price = &mut record.price_info;
    price.current_price = quote.price;
    price.previous_close = quote.previous_close;
    price.open = quote.open;
    price.day_high = quote.high;
    price.day_low = quote.low;
    price.volume = quote.volume;
    price.change = quote.change;
    price.change_percent = quote.change_percent;
    Some(record)
}

fn match_to_result(m: SymbolMatch) -> Option<SearchResult> {
    if !m.region.contains("India") {
        return None;
    }
    let exchange = if m.symbol.contains("NSE") {
        Exchange::Nse
    } else {
        Exchange::Bse
    };
    let symbol = m
        .symbol
        .trim_start_matches("NSE:")
        .trim_start_matches("BSE:")
        .trim_end_matches(".BSE")
        .trim_end_matches(".NSE")
        .to_string();
    if symbol.is_empty() {
        return None;
    }
    Some(SearchResult::new(symbol, m.name, exchange.as_str()))
}

// ============================================================================
// StockDataProvider Implementation
// ============================================================================

#[async_trait]
impl StockDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            exchanges: Exchange::ALL,
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
        let symbol = symbol.trim().to_uppercase();
        let av = av_symbol(&symbol, exchange);
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", av.as_str())];

        let text = self.request(&params, &symbol).await?;
        let response: GlobalQuoteResponse = http::parse_json(PROVIDER_ID, &text)?;
        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        Ok(response
            .quote
            .and_then(|q| quote_to_record(&symbol, exchange, q)))
    }

    async fn search_symbols(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MarketDataError> {
        let params = [("function", "SYMBOL_SEARCH"), ("keywords", query)];

        let text = self.request(&params, query).await?;
        let response: SymbolSearchResponse = http::parse_json(PROVIDER_ID, &text)?;
        Self::check_api_error(
            &response.error_message,
            &response.note,
            &response.information,
        )?;

        Ok(response
            .best_matches
            .into_iter()
            .filter_map(match_to_result)
            .take(limit)
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
