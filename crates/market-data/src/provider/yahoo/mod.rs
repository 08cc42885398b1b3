//! Yahoo Finance stock data provider.
//!
//! The most complete of the live sources: besides price and valuation it
//! carries forward estimates, extended financials, analyst targets, a year of
//! daily closes and recent news.
//!
//! - Fundamentals come from the quoteSummary API, which needs a cookie/crumb
//!   pair obtained once and refreshed on 401.
//! - Price history and search go through `yahoo_finance_api`.
//! - Indian listings use the `.NS` / `.BO` suffixes. When the requested
//!   listing has no market price the other exchange is tried once, and the
//!   listing that answered is remembered for a day.
//!
//! Yahoo reports ratios (margins, returns, yields, holdings) as fractions;
//! they are converted to percent so they merge cleanly with the other sources.

mod models;

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{header, Client};
use time::OffsetDateTime;
use tracing::{debug, warn};
use urlencoding::encode;
use yahoo_finance_api as yahoo;

use crate::cache::{cache_key, ResponseCache};
use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;
use crate::models::{Exchange, NewsItem, PriceHistory, SearchResult, StockRecord};
use crate::provider::http::{self, BROWSER_USER_AGENT};
use crate::provider::{CooldownTracker, ProviderCapabilities, StockDataProvider};

use models::{raw, YahooNewsResponse, YahooQuoteSummaryResponse, YahooQuoteSummaryResult};

const PROVIDER_ID: &str = "YAHOO";
const PROVIDER_NAME: &str = "Yahoo Finance";
const COOLDOWN: Duration = Duration::from_secs(60 * 60);

const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const NEWS_URL: &str = "https://query2.finance.yahoo.com/v1/finance/search";
const SUMMARY_MODULES: &str =
    "price,summaryProfile,summaryDetail,defaultKeyStatistics,financialData";

const NSE_SUFFIX: &str = ".NS";
const BSE_SUFFIX: &str = ".BO";

/// Trading days kept in the price history.
const MAX_HISTORY_DAYS: usize = 252;
const MAX_NEWS: usize = 10;

// ============================================================================
// Crumb/Cookie Authentication
// ============================================================================

/// Cached Yahoo authentication data
#[derive(Debug, Clone)]
struct CrumbData {
    cookie: String,
    crumb: String,
}

// ============================================================================
// Yahoo Provider
// ============================================================================

/// Yahoo Finance provider.
pub struct YahooProvider {
    connector: yahoo::YahooConnector,
    client: Client,
    crumb: RwLock<Option<CrumbData>>,
    quote_summary_url: String,
    /// "NSE:RELIANCE" -> the Yahoo ticker that answered, e.g. "RELIANCE.NS".
    tickers: ResponseCache<String>,
    cooldown: CooldownTracker,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider.
    pub async fn new(config: &MarketDataConfig) -> Result<Self, MarketDataError> {
        Self::with_quote_summary_url(config, QUOTE_SUMMARY_URL).await
    }

    /// Create a provider against a different quoteSummary endpoint.
    pub async fn with_quote_summary_url(
        config: &MarketDataConfig,
        quote_summary_url: impl Into<String>,
    ) -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to initialize Yahoo connector: {}", e),
            })?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(BROWSER_USER_AGENT),
        );
        Ok(Self {
            connector,
            client: http::build_client(headers, config.provider_timeout, false),
            crumb: RwLock::new(None),
            quote_summary_url: quote_summary_url.into(),
            tickers: ResponseCache::new(config.resolution_ttl),
            cooldown: CooldownTracker::new(),
        })
    }

    // ========================================================================
    // Crumb/Cookie Authentication
    // ========================================================================

    fn cached_crumb(&self) -> Option<CrumbData> {
        self.crumb
            .read()
            .unwrap_or_else(|poisoned| {
                warn!("Yahoo crumb lock poisoned, recovering");
                poisoned.into_inner()
            })
            .clone()
    }

    fn store_crumb(&self, crumb: Option<CrumbData>) {
        let mut guard = self.crumb.write().unwrap_or_else(|poisoned| {
            warn!("Yahoo crumb lock poisoned, recovering");
            poisoned.into_inner()
        });
        *guard = crumb;
    }

    /// Ensure we have a valid Yahoo authentication crumb.
    async fn ensure_crumb(&self) -> Result<CrumbData, MarketDataError> {
        if let Some(crumb) = self.cached_crumb() {
            return Ok(crumb);
        }
        self.fetch_crumb().await
    }

    /// Fetch a new Yahoo authentication crumb.
    async fn fetch_crumb(&self) -> Result<CrumbData, MarketDataError> {
        // Step 1: Get cookie from fc.yahoo.com (the page itself 404s; the cookie is what matters)
        let response = self
            .client
            .get("https://fc.yahoo.com")
            .send()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to get cookie: {}", e),
            })?;

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split_once(';').map(|(v, _)| v.to_string()))
            .ok_or_else(|| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: "Failed to parse Yahoo cookie".to_string(),
            })?;

        // Step 2: Get crumb using cookie
        let request = self
            .client
            .get("https://query1.finance.yahoo.com/v1/test/getcrumb")
            .header(header::COOKIE, &cookie);
        let crumb = http::send(PROVIDER_ID, "crumb", request)
            .await?
            .text()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to read crumb: {}", e),
            })?;

        let crumb_data = CrumbData { cookie, crumb };
        self.store_crumb(Some(crumb_data.clone()));
        Ok(crumb_data)
    }

    /// Clear the cached crumb (used when authentication fails)
    fn clear_crumb(&self) {
        self.store_crumb(None);
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    /// quoteSummary for one Yahoo ticker. `Ok(None)` when Yahoo has no result.
    async fn fetch_quote_summary(
        &self,
        ticker: &str,
    ) -> Result<Option<YahooQuoteSummaryResult>, MarketDataError> {
        let crumb = self.ensure_crumb().await?;
        let url = format!(
            "{}/{}?modules={}&crumb={}",
            self.quote_summary_url,
            encode(ticker),
            SUMMARY_MODULES,
            encode(&crumb.crumb)
        );
        let request = self.client.get(&url).header(header::COOKIE, &crumb.cookie);

        let response = match http::send(PROVIDER_ID, ticker, request).await {
            Ok(response) => response,
            Err(MarketDataError::ProviderError { message, .. })
                if message.contains(reqwest::StatusCode::UNAUTHORIZED.as_str()) =>
            {
                self.clear_crumb();
                return Err(MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: "Yahoo authentication expired".to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let data: YahooQuoteSummaryResponse = http::read_json(PROVIDER_ID, response).await?;
        Ok(data
            .quote_summary
            .result
            .and_then(|results| results.into_iter().next()))
    }

    /// Summary for the requested listing, falling back once to the other exchange.
    async fn fetch_listing(
        &self,
        symbol: &str,
        exchange: Exchange,
    ) -> Result<Option<(String, YahooQuoteSummaryResult)>, MarketDataError> {
        let key = cache_key(symbol, exchange);
        let mut candidates = vec![yahoo_ticker(symbol, exchange)];
        let alternate = yahoo_ticker(symbol, exchange.alternate());
        match self.tickers.get(&key) {
            Some(known) if known == alternate => candidates.insert(0, known),
            _ => candidates.push(alternate),
        }

        let mut last_error = None;
        for ticker in candidates {
            match self.fetch_quote_summary(&ticker).await {
                Ok(Some(result)) if result.has_market_price() => {
                    self.tickers.set_default(key, ticker.clone());
                    return Ok(Some((ticker, result)));
                }
                Ok(_) => debug!("Yahoo has no market price for {}", ticker),
                Err(e) if e.is_rate_limit() => return Err(e),
                Err(e) => {
                    debug!("Yahoo quoteSummary failed for {}: {}", ticker, e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(MarketDataError::SymbolNotFound(_)) | None => Ok(None),
            Some(e) => Err(e),
        }
    }

    /// Daily closes for the last year. Best effort.
    async fn fetch_price_history(&self, ticker: &str) -> PriceHistory {
        let end = OffsetDateTime::now_utc();
        let start = end - time::Duration::days(365);

        let quotes = match self.connector.get_quote_history(ticker, start, end).await {
            Ok(response) => match response.quotes() {
                Ok(quotes) => quotes,
                Err(e) => {
                    debug!("No price history for {}: {}", ticker, e);
                    return PriceHistory::default();
                }
            },
            Err(yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult) => {
                debug!("No price history for {}", ticker);
                return PriceHistory::default();
            }
            Err(e) => {
                warn!("Yahoo price history failed for {}: {}", ticker, e);
                return PriceHistory::default();
            }
        };

        let skip = quotes.len().saturating_sub(MAX_HISTORY_DAYS);
        let mut history = PriceHistory::default();
        for quote in quotes.into_iter().skip(skip) {
            let Some(date) = Utc.timestamp_opt(quote.timestamp as i64, 0).single() else {
                continue;
            };
            if !quote.close.is_finite() {
                continue;
            }
            history.dates.push(date.format("%Y-%m-%d").to_string());
            history.prices.push(quote.close);
            history.volumes.push(quote.volume as f64);
        }
        history
    }

    /// Recent headlines. Best effort.
    async fn fetch_news(&self, ticker: &str) -> Vec<NewsItem> {
        let url = format!(
            "{}?q={}&quotesCount=0&newsCount={}",
            NEWS_URL,
            encode(ticker),
            MAX_NEWS
        );
        let result = match http::send(PROVIDER_ID, ticker, self.client.get(&url)).await {
            Ok(response) => http::read_json::<YahooNewsResponse>(PROVIDER_ID, response).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(data) => data
                .news
                .into_iter()
                .filter(|n| !n.title.is_empty())
                .take(MAX_NEWS)
                .map(|n| NewsItem {
                    title: n.title,
                    publisher: n.publisher,
                    link: n.link,
                    published: n.provider_publish_time,
                    kind: n.kind,
                })
                .collect(),
            Err(e) => {
                debug!("Yahoo news failed for {}: {}", ticker, e);
                Vec::new()
            }
        }
    }
}

// ============================================================================
// Mapping
// ============================================================================

/// Yahoo ticker for an Indian listing, e.g. ("reliance", NSE) -> "RELIANCE.NS".
fn yahoo_ticker(symbol: &str, exchange: Exchange) -> String {
    let base = strip_suffix(&symbol.trim().to_uppercase()).to_string();
    match exchange {
        Exchange::Nse => format!("{}{}", base, NSE_SUFFIX),
        Exchange::Bse => format!("{}{}", base, BSE_SUFFIX),
    }
}

fn strip_suffix(ticker: &str) -> &str {
    ticker
        .strip_suffix(NSE_SUFFIX)
        .or_else(|| ticker.strip_suffix(BSE_SUFFIX))
        .unwrap_or(ticker)
}

/// Exchange implied by a Yahoo ticker suffix, if it is an Indian listing.
fn listing_exchange(ticker: &str) -> Option<Exchange> {
    if ticker.ends_with(NSE_SUFFIX) {
        Some(Exchange::Nse)
    } else if ticker.ends_with(BSE_SUFFIX) {
        Some(Exchange::Bse)
    } else {
        None
    }
}

fn percent(value: Option<f64>) -> Option<f64> {
    value.map(|v| v * 100.0)
}

fn summary_to_record(
    symbol: &str,
    exchange: Exchange,
    ticker: &str,
    result: YahooQuoteSummaryResult,
) -> StockRecord {
    let mut record = StockRecord::new(PROVIDER_NAME, strip_suffix(symbol), exchange);
    let price = result.price.unwrap_or_default();
    let profile = result.summary_profile.unwrap_or_default();
    let detail = result.summary_detail.unwrap_or_default();
    let stats = result.default_key_statistics.unwrap_or_default();
    let financial = result.financial_data.unwrap_or_default();

    let basic = &mut record.basic_info;
    basic.company_name = format_name(
        price.long_name.as_deref(),
        price.short_name.as_deref(),
        strip_suffix(symbol),
    );
    basic.sector = profile.sector.as_deref().map(format_sector).unwrap_or_default();
    basic.industry = profile.industry.unwrap_or_default();
    basic.website = profile.website.unwrap_or_default();
    basic.description = profile.long_business_summary.unwrap_or_default();
    basic.country = profile.country.unwrap_or_else(|| "India".to_string());
    basic.employees = profile.full_time_employees;
    basic
        .metadata
        .insert("yahoo_symbol".to_string(), ticker.to_string());

    let p = &mut record.price_info;
    p.current_price = raw(&price.regular_market_price).or(raw(&financial.current_price));
    p.previous_close = raw(&price.regular_market_previous_close).or(raw(&detail.previous_close));
    p.open = raw(&price.regular_market_open).or(raw(&detail.open));
    p.day_high = raw(&price.regular_market_day_high).or(raw(&detail.day_high));
    p.day_low = raw(&price.regular_market_day_low).or(raw(&detail.day_low));
    p.fifty_two_week_high = raw(&detail.fifty_two_week_high);
    p.fifty_two_week_low = raw(&detail.fifty_two_week_low);
    p.change = raw(&price.regular_market_change);
    p.change_percent = percent(raw(&price.regular_market_change_percent));
    p.volume = raw(&price.regular_market_volume).or(raw(&detail.volume));
    p.avg_volume = raw(&detail.average_volume);

    let v = &mut record.valuation;
    v.market_cap = raw(&price.market_cap).or(raw(&detail.market_cap));
    v.enterprise_value = raw(&stats.enterprise_value);
    v.pe_ratio = raw(&detail.trailing_pe);
    v.forward_pe = raw(&detail.forward_pe).or(raw(&stats.forward_pe));
    v.peg_ratio = raw(&stats.peg_ratio);
    v.pb_ratio = raw(&stats.price_to_book);
    v.ps_ratio = raw(&detail.price_to_sales_trailing12_months);
    v.ev_to_ebitda = raw(&stats.enterprise_to_ebitda);
    v.ev_to_revenue = raw(&stats.enterprise_to_revenue);
    v.dividend_yield = percent(raw(&detail.dividend_yield));

    let f = &mut record.financials;
    f.revenue = raw(&financial.total_revenue);
    f.revenue_growth = percent(raw(&financial.revenue_growth));
    f.gross_profit = raw(&financial.gross_profits);
    f.ebitda = raw(&financial.ebitda);
    f.net_income = raw(&stats.net_income_to_common);
    f.gross_margin = percent(raw(&financial.gross_margins));
    f.operating_margin = percent(raw(&financial.operating_margins));
    f.profit_margin = percent(raw(&financial.profit_margins));
    f.ebitda_margin = percent(raw(&financial.ebitda_margins));
    f.roe = percent(raw(&financial.return_on_equity));
    f.roa = percent(raw(&financial.return_on_assets));
    f.debt_to_equity = raw(&financial.debt_to_equity);
    f.current_ratio = raw(&financial.current_ratio);
    f.quick_ratio = raw(&financial.quick_ratio);
    f.total_cash = raw(&financial.total_cash);
    f.total_debt = raw(&financial.total_debt);

    let s = &mut record.per_share;
    s.eps = raw(&stats.trailing_eps);
    s.forward_eps = raw(&stats.forward_eps);
    s.book_value = raw(&stats.book_value);
    s.revenue_per_share = raw(&financial.revenue_per_share);

    let d = &mut record.dividends;
    d.dividend_rate = raw(&detail.dividend_rate);
    d.dividend_yield = percent(raw(&detail.dividend_yield));
    d.payout_ratio = percent(raw(&detail.payout_ratio));
    d.ex_dividend_date = raw(&detail.ex_dividend_date)
        .and_then(|ts| Utc.timestamp_opt(ts as i64, 0).single())
        .map(|dt: DateTime<Utc>| dt.format("%Y-%m-%d").to_string());

    let a = &mut record.analyst_data;
    a.target_mean_price = raw(&financial.target_mean_price);
    a.target_high_price = raw(&financial.target_high_price);
    a.target_low_price = raw(&financial.target_low_price);
    a.recommendation = financial.recommendation_key.unwrap_or_default();
    a.num_analysts = raw(&financial.number_of_analyst_opinions).map(|n| n as u64);

    record.ownership.insider_holding = percent(raw(&stats.held_percent_insiders));
    record.ownership.institution_holding = percent(raw(&stats.held_percent_institutions));

    record
}

// ============================================================================
// StockDataProvider Implementation
// ============================================================================

#[async_trait]
impl StockDataProvider for YahooProvider {
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
            most_complete: true,
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
        let symbol = strip_suffix(&symbol.trim().to_uppercase()).to_string();
        debug!("Fetching {}:{} from Yahoo", exchange, symbol);

        let Some((ticker, summary)) = self.fetch_listing(&symbol, exchange).await? else {
            return Ok(None);
        };

        let mut record = summary_to_record(&symbol, exchange, &ticker, summary);
        record.price_history = self.fetch_price_history(&ticker).await;
        record.news = self.fetch_news(&ticker).await;
        Ok(Some(record))
    }

    async fn search_symbols(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MarketDataError> {
        debug!("Searching Yahoo for '{}'", query);

        let encoded_query = encode(query);
        let result = self
            .connector
            .search_ticker(&encoded_query)
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })?;

        Ok(result
            .quotes
            .iter()
            .filter_map(|item| {
                let exchange = listing_exchange(&item.symbol)?;
                let symbol = strip_suffix(&item.symbol);
                let name = format_name(Some(&item.long_name), Some(&item.short_name), symbol);
                Some(SearchResult::new(symbol, name, exchange.as_str()))
            })
            .take(limit)
            .collect())
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Display name: long name, else short name, else the symbol.
fn format_name(long_name: Option<&str>, short_name: Option<&str>, symbol: &str) -> String {
    [long_name, short_name]
        .into_iter()
        .flatten()
        .map(|n| n.replace("&amp;", "&").trim().to_string())
        .find(|n| !n.is_empty())
        .unwrap_or_else(|| symbol.to_string())
}

/// Convert snake_case sector to Title Case.
fn format_sector(sector: &str) -> String {
    sector
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tests
// ============================================================================
