//! NSE India stock data provider.
//!
//! Scrapes the JSON endpoints behind nseindia.com. The site refuses API calls
//! without the session cookies set by a visit to the home page, so the client
//! keeps a cookie store and primes it before the first request (and again
//! after a 401/403).
//!
//! Serves NSE listings only. Besides the quote it pulls the corporate-info
//! bundle: quarterly results, shareholding, corporate actions and
//! announcements.

mod models;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use urlencoding::encode;

use crate::config::MarketDataConfig;
use crate::errors::MarketDataError;
use crate::models::{
    Announcement, CorporateAction, Exchange, QuarterlyResult, SearchResult, Shareholding,
    StockRecord,
};
use crate::provider::http::{self, browser_headers, value_to_f64};
use crate::provider::{CooldownTracker, ProviderCapabilities, StockDataProvider};

use models::{
    NseAutocompleteResponse, NseCorpInfoResponse, NseFinancialResult, NseQuoteResponse,
};

const BASE_URL: &str = "https://www.nseindia.com";
const PROVIDER_ID: &str = "NSE_INDIA";
const PROVIDER_NAME: &str = "NSE India";
const COOLDOWN: Duration = Duration::from_secs(30 * 60);

const MAX_QUARTERS: usize = 8;
const MAX_CORPORATE_ACTIONS: usize = 10;
const MAX_ANNOUNCEMENTS: usize = 5;

/// NSE India provider.
pub struct NseIndiaProvider {
    client: Client,
    base_url: String,
    cookies_ready: AtomicBool,
    cooldown: CooldownTracker,
}

impl NseIndiaProvider {
    pub fn new(config: &MarketDataConfig) -> Self {
        Self::with_base_url(config, BASE_URL)
    }

    /// Point the provider at another host (a mirror, or a local stub).
    pub fn with_base_url(config: &MarketDataConfig, base_url: impl Into<String>) -> Self {
        let client = http::build_client(
            browser_headers("https://www.nseindia.com/"),
            config.provider_timeout,
            true,
        );
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookies_ready: AtomicBool::new(false),
            cooldown: CooldownTracker::new(),
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Visit the home page once so the cookie store holds a session.
    async fn ensure_cookies(&self) {
        if self.cookies_ready.load(Ordering::Acquire) {
            return;
        }
        match self.client.get(&self.base_url).send().await {
            Ok(_) => self.cookies_ready.store(true, Ordering::Release),
            // Carry on without; the API call will tell us if it matters.
            Err(e) => warn!("Failed to initialize NSE cookies: {}", e),
        }
    }

    /// GET an API path with the session, re-priming cookies on 401/403.
    async fn get_api(&self, path: &str, subject: &str) -> Result<reqwest::Response, MarketDataError> {
        self.ensure_cookies().await;
        let url = format!("{}{}", self.base_url, path);
        let result = http::send(PROVIDER_ID, subject, self.client.get(&url)).await;

        if let Err(MarketDataError::ProviderError { message, .. }) = &result {
            if message.contains(StatusCode::UNAUTHORIZED.as_str())
                || message.contains(StatusCode::FORBIDDEN.as_str())
            {
                debug!("NSE session rejected, clearing cookie flag");
                self.cookies_ready.store(false, Ordering::Release);
            }
        }
        result
    }

    // ========================================================================
    // Fetching
    // ========================================================================

    async fn fetch_quote(&self, symbol: &str) -> Result<NseQuoteResponse, MarketDataError> {
        let path = format!("/api/quote-equity?symbol={}", encode(symbol));
        let response = self.get_api(&path, symbol).await?;
        http::read_json(PROVIDER_ID, response).await
    }

    /// Corporate info is a second call; its failure never fails the fetch.
    async fn fetch_corporate_info(&self, symbol: &str) -> Option<NseCorpInfoResponse> {
        let path = format!(
            "/api/top-corp-info?symbol={}&market=equities",
            encode(symbol)
        );
        let result = match self.get_api(&path, symbol).await {
            Ok(response) => http::read_json(PROVIDER_ID, response).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(info) => Some(info),
            Err(e) => {
                if e.is_rate_limit() {
                    self.absorb_failure("corporate info", symbol, &e);
                } else {
                    warn!("NSE corporate info fetch failed for {}: {}", symbol, e);
                }
                None
            }
        }
    }
}

// ============================================================================
// Mapping
// ============================================================================

fn quote_to_record(symbol: &str, quote: NseQuoteResponse) -> Option<StockRecord> {
    let info = quote.info?;
    let mut record = StockRecord::new(PROVIDER_NAME, symbol, Exchange::Nse);

    let basic = &mut record.basic_info;
    basic.company_name = info.company_name;
    basic.sector = first_non_empty(&[
        &quote.industry_info.sector,
        &quote.metadata.pd_sector_ind,
    ]);
    basic.industry = first_non_empty(&[&quote.industry_info.industry, &info.industry]);
    basic.country = "India".to_string();
    basic.isin = info.isin;
    if !quote.industry_info.macro_sector.is_empty() {
        basic
            .metadata
            .insert("macro".to_string(), quote.industry_info.macro_sector);
    }
    if !quote.industry_info.basic_industry.is_empty() {
        basic
            .metadata
            .insert("basic_industry".to_string(), quote.industry_info.basic_industry);
    }

    let p = quote.price_info;
    let price = &mut record.price_info;
    price.current_price = p.last_price;
    price.previous_close = p.previous_close;
    price.open = p.open;
    price.day_high = p.intra_day_high_low.max;
    price.day_low = p.intra_day_high_low.min;
    price.fifty_two_week_high = p.week_high_low.max;
    price.fifty_two_week_low = p.week_high_low.min;
    price.change = p.change;
    price.change_percent = p.p_change;
    price.vwap = p.vwap;

    let valuation = &mut record.valuation;
    valuation.pe_ratio = quote.metadata.pd_symbol_pe;
    valuation.sector_pe = quote.metadata.pd_sector_pe;
    valuation.face_value = quote.security_info.face_value;
    valuation.issued_size = quote.security_info.issued_size;
    if let (Some(price), Some(shares)) = (p.last_price, quote.security_info.issued_size) {
        valuation.market_cap = Some(price * shares);
    }

    let trading = &mut record.trading_info;
    trading.upper_circuit = p.upper_cp;
    trading.lower_circuit = p.lower_cp;
    trading.listing_date = quote.metadata.listing_date;
    trading.is_fno = info.is_fno_sec;

    Some(record)
}

fn apply_corporate_info(record: &mut StockRecord, corp: NseCorpInfoResponse) {
    record.quarterly_results = corp
        .financial_results
        .data
        .into_iter()
        .take(MAX_QUARTERS)
        .map(quarterly_result)
        .collect();

    if let Some(shareholding) = latest_shareholding(corp.shareholdings_patterns.data) {
        record.shareholding = shareholding;
    }

    record.corporate_actions = corp
        .corporate_actions
        .data
        .into_iter()
        .take(MAX_CORPORATE_ACTIONS)
        .map(|a| CorporateAction {
            date: a.exdate,
            action: a.purpose,
        })
        .collect();

    record.announcements = corp
        .latest_announcements
        .data
        .into_iter()
        .take(MAX_ANNOUNCEMENTS)
        .map(|a| Announcement {
            date: a.broadcastdate,
            subject: a.subject,
        })
        .collect();
}

fn quarterly_result(row: NseFinancialResult) -> QuarterlyResult {
    QuarterlyResult {
        period_end: row.to_date,
        revenue: row.income,
        profit_before_tax: row.profit_before_tax,
        profit_after_tax: row.profit_after_tax,
        eps: row.diluted_eps,
        audited: row.audited,
        consolidated: row.consolidated,
    }
}

/// Pick the most recent quarter and flatten its rows, dropping the "Total" row.
fn latest_shareholding(
    quarters: BTreeMap<String, Vec<BTreeMap<String, Value>>>,
) -> Option<Shareholding> {
    let (as_of, rows) = quarters
        .into_iter()
        .max_by(|(a, _), (b, _)| match (parse_quarter(a), parse_quarter(b)) {
            (Some(da), Some(db)) => da.cmp(&db),
            _ => a.cmp(b),
        })?;

    let breakdown = rows
        .into_iter()
        .flatten()
        .filter(|(category, _)| category != "Total")
        .filter_map(|(category, value)| value_to_f64(&value).map(|pct| (category, pct)))
        .collect();

    Some(Shareholding { as_of, breakdown })
}

/// NSE quarter labels look like "31-Dec-2024" (sometimes upper-cased).
fn parse_quarter(label: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(label.trim(), "%d-%b-%Y").ok()
}

fn first_non_empty(candidates: &[&String]) -> String {
    candidates
        .iter()
        .find(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
        .unwrap_or_default()
}

// ============================================================================
// StockDataProvider Implementation
// ============================================================================

#[async_trait]
impl StockDataProvider for NseIndiaProvider {
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
        debug!("Fetching {} from NSE India", symbol);

        let quote = self.fetch_quote(&symbol).await?;
        let Some(mut record) = quote_to_record(&symbol, quote) else {
            return Ok(None);
        };

        if let Some(corp) = self.fetch_corporate_info(&symbol).await {
            apply_corporate_info(&mut record, corp);
        }
        Ok(Some(record))
    }

    async fn search_symbols(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, MarketDataError> {
        let path = format!("/api/search/autocomplete?q={}", encode(query));
        let response = self.get_api(&path, query).await?;
        let data: NseAutocompleteResponse = http::read_json(PROVIDER_ID, response).await?;

        Ok(data
            .symbols
            .into_iter()
            .filter(|m| !m.symbol.is_empty())
            .filter(|m| m.result_sub_type.is_empty() || m.result_sub_type == "equity")
            .take(limit)
            .map(|m| SearchResult::new(m.symbol, m.symbol_info, Exchange::Nse.as_str()))
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn quote_json() -> &'static str {
        r#"{
            "info": {"symbol": "RELIANCE", "companyName": "Reliance Industries Limited",
                     "industry": "Refineries & Marketing", "isin": "INE002A01018", "isFNOSec": true},
            "metadata": {"pdSectorInd": "NIFTY 50", "pdSymbolPe": 24.61, "pdSectorPe": 19.2,
                         "listingDate": "29-Nov-1995"},
            "priceInfo": {"lastPrice": 1400, "previousClose": 1391.2, "open": 1395,
                          "change": 8.8, "pChange": 0.63, "vwap": 1398.21,
                          "upperCP": "1530.30", "lowerCP": "1252.10",
                          "intraDayHighLow": {"min": 1390.1, "max": 1405.0},
                          "weekHighLow": {"min": 1115.55, "max": 1608.8}},
            "securityInfo": {"faceValue": 10, "issuedSize": 1000},
            "industryInfo": {"macro": "Energy", "sector": "Oil Gas & Consumable Fuels",
                             "industry": "Petroleum Products", "basicIndustry": "Refineries & Marketing"}
        }"#
    }

    #[test]
    fn test_quote_to_record() {
        let quote: NseQuoteResponse = serde_json::from_str(quote_json()).unwrap();
        let record = quote_to_record("RELIANCE", quote).unwrap();

        assert_eq!(record.provider, "NSE India");
        assert_eq!(record.basic_info.ticker, "RELIANCE");
        assert_eq!(record.basic_info.exchange, "NSE");
        assert_eq!(record.basic_info.sector, "Oil Gas & Consumable Fuels");
        assert_eq!(record.basic_info.industry, "Petroleum Products");
        assert_eq!(record.basic_info.metadata["macro"], "Energy");
        assert_eq!(record.price_info.current_price, Some(1400.0));
        assert_eq!(record.price_info.day_high, Some(1405.0));
        assert_eq!(record.price_info.fifty_two_week_low, Some(1115.55));
        assert_eq!(record.valuation.pe_ratio, Some(24.61));
        assert_eq!(record.valuation.market_cap, Some(1_400_000.0));
        assert_eq!(record.trading_info.upper_circuit, Some(1530.3));
        assert_eq!(record.trading_info.is_fno, Some(true));
        assert!(record.has_data());
    }

    #[test]
    fn test_identity_only_quote_has_no_data() {
        let quote: NseQuoteResponse =
            serde_json::from_str(r#"{"info": {"symbol": "NOPE"}, "priceInfo": {}}"#).unwrap();
        let record = quote_to_record("NOPE", quote).unwrap();
        assert_eq!(record.basic_info.ticker, "NOPE");
        assert!(record.basic_info.company_name.is_empty());
        assert!(!record.has_data());
    }

    #[test]
    fn test_quote_without_info_is_none() {
        let quote: NseQuoteResponse = serde_json::from_str(r#"{"priceInfo": {}}"#).unwrap();
        assert!(quote_to_record("NOPE", quote).is_none());
    }

    #[test]
    fn test_sector_falls_back_to_index_metadata() {
        let quote: NseQuoteResponse = serde_json::from_str(
            r#"{"info": {"companyName": "X Ltd"}, "metadata": {"pdSectorInd": "NIFTY IT"}}"#,
        )
        .unwrap();
        let record = quote_to_record("X", quote).unwrap();
        assert_eq!(record.basic_info.sector, "NIFTY IT");
        assert_eq!(record.price_info.current_price, None);
    }

    #[test]
    fn test_apply_corporate_info_limits_and_shapes() {
        let rows: Vec<Value> = (0..12)
            .map(|i| serde_json::json!({"to_date": format!("Q{}", i), "income": "100"}))
            .collect();
        let actions: Vec<Value> = (0..15)
            .map(|i| serde_json::json!({"exdate": format!("{}-Jan-2024", i + 1), "purpose": "Dividend"}))
            .collect();
        let json = serde_json::json!({
            "financial_results": {"data": rows},
            "shareholdings_patterns": {"data": {
                "30-Sep-2024": [{"Promoter & Promoter Group": "50.24"}],
                "31-Dec-2024": [{"Promoter & Promoter Group": "50.13"}, {"Public": "49.87"}, {"Total": "100"}],
                "30-Jun-2024": [{"Promoter & Promoter Group": "50.30"}]
            }},
            "corporate_actions": {"data": actions},
            "latest_announcements": {"data": [
                {"broadcastdate": "a", "subject": "1"}, {"broadcastdate": "b", "subject": "2"},
                {"broadcastdate": "c", "subject": "3"}, {"broadcastdate": "d", "subject": "4"},
                {"broadcastdate": "e", "subject": "5"}, {"broadcastdate": "f", "subject": "6"}
            ]}
        });
        let corp: NseCorpInfoResponse = serde_json::from_value(json).unwrap();

        let mut record = StockRecord::new(PROVIDER_NAME, "RELIANCE", Exchange::Nse);
        apply_corporate_info(&mut record, corp);

        assert_eq!(record.quarterly_results.len(), 8);
        assert_eq!(record.quarterly_results[0].revenue, Some(100.0));
        assert_eq!(record.corporate_actions.len(), 10);
        assert_eq!(record.announcements.len(), 5);
        assert_eq!(record.shareholding.as_of, "31-Dec-2024");
        assert_eq!(record.shareholding.breakdown.len(), 2);
        assert_eq!(record.shareholding.breakdown["Public"], 49.87);
        assert!(!record.shareholding.breakdown.contains_key("Total"));
    }

    #[test]
    fn test_latest_shareholding_orders_by_date_not_text() {
        let mut quarters = BTreeMap::new();
        quarters.insert("30-Jun-2025".to_string(), vec![]);
        quarters.insert("31-Dec-2024".to_string(), vec![]);
        quarters.insert("31-MAR-2025".to_string(), vec![]);
        let latest = latest_shareholding(quarters).unwrap();
        assert_eq!(latest.as_of, "30-Jun-2025");

        assert!(latest_shareholding(BTreeMap::new()).is_none());
    }

    #[test]
    fn test_parse_quarter() {
        assert_eq!(
            parse_quarter("31-DEC-2024"),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
        assert_eq!(
            parse_quarter("30-Sep-2024"),
            NaiveDate::from_ymd_opt(2024, 9, 30)
        );
        assert_eq!(parse_quarter("Q3 FY25"), None);
    }

    #[tokio::test]
    async fn test_bse_is_not_served() {
        let provider = NseIndiaProvider::new(&MarketDataConfig::default());
        let result = provider.fetch_record("RELIANCE", Exchange::Bse).await.unwrap();
        assert!(result.is_none());
        assert!(!provider.capabilities().covers(Exchange::Bse));
    }
}
