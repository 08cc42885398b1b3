//! Canonical stock record.
//!
//! Every provider produces this shape. All fields are optional and default to
//! zero/empty, but every section is always present, so a serialized record
//! never lacks a key.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Exchange;

/// Normalized snapshot of one listed instrument.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockRecord {
    pub basic_info: BasicInfo,
    pub price_info: PriceInfo,
    pub valuation: Valuation,
    pub financials: Financials,
    pub per_share: PerShare,
    pub dividends: Dividends,
    pub analyst_data: AnalystData,
    pub ownership: Ownership,
    pub trading_info: TradingInfo,

    /// Populated only from the local fundamentals store.
    pub screener_data: ScreenerData,

    pub quarterly_results: Vec<QuarterlyResult>,
    pub shareholding: Shareholding,
    pub corporate_actions: Vec<CorporateAction>,
    pub announcements: Vec<Announcement>,
    pub news: Vec<NewsItem>,
    pub price_history: PriceHistory,

    /// Display name of the provider that supplied the primary record.
    pub provider: String,

    /// Secondary sources that filled at least one field.
    pub enriched_by: Vec<String>,
}

impl StockRecord {
    /// Create an empty record attributed to `provider`.
    pub fn new(provider: impl Into<String>, ticker: &str, exchange: Exchange) -> Self {
        let mut record = Self {
            provider: provider.into(),
            ..Default::default()
        };
        record.basic_info.ticker = ticker.to_uppercase();
        record.basic_info.exchange = exchange.to_string();
        record
    }

    /// True when the record carries anything beyond its identity.
    pub fn has_data(&self) -> bool {
        use crate::enrichment::Backfill;

        !(self.basic_info.company_name.trim().is_empty()
            && self.price_info.is_blank()
            && self.valuation.is_blank()
            && self.financials.is_blank())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub company_name: String,
    pub ticker: String,
    pub exchange: String,
    pub sector: String,
    pub industry: String,
    pub description: String,
    pub website: String,
    pub country: String,
    pub isin: String,
    pub employees: Option<u64>,
    /// Free-text extras a provider wants to surface (e.g., "macro", "basic_industry").
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceInfo {
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub open: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub vwap: Option<f64>,
    pub volume: Option<f64>,
    pub avg_volume: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Valuation {
    /// Rupees.
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub forward_pe: Option<f64>,
    pub sector_pe: Option<f64>,
    pub peg_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub ps_ratio: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub ev_to_revenue: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub face_value: Option<f64>,
    pub issued_size: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Financials {
    pub revenue: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub gross_profit: Option<f64>,
    pub ebitda: Option<f64>,
    pub net_income: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub profit_margin: Option<f64>,
    pub ebitda_margin: Option<f64>,
    pub roe: Option<f64>,
    pub roce: Option<f64>,
    pub roa: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub total_cash: Option<f64>,
    pub total_debt: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerShare {
    pub eps: Option<f64>,
    pub forward_eps: Option<f64>,
    pub book_value: Option<f64>,
    pub revenue_per_share: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dividends {
    pub dividend_rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub payout_ratio: Option<f64>,
    /// ISO date (YYYY-MM-DD)
    pub ex_dividend_date: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystData {
    pub target_mean_price: Option<f64>,
    pub target_high_price: Option<f64>,
    pub target_low_price: Option<f64>,
    pub recommendation: String,
    pub num_analysts: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ownership {
    pub insider_holding: Option<f64>,
    pub institution_holding: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingInfo {
    pub upper_circuit: Option<f64>,
    pub lower_circuit: Option<f64>,
    pub listing_date: String,
    pub is_fno: Option<bool>,
}

/// Tables and qualitative notes kept in the local fundamentals store.
///
/// The tables are stored as the scraper produced them, so they stay loosely
/// typed JSON rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenerData {
    pub quarterly_results: Vec<Value>,
    pub profit_loss: Vec<Value>,
    pub balance_sheet: Vec<Value>,
    pub cash_flow: Vec<Value>,
    pub shareholding: Vec<Value>,
    pub ratios: BTreeMap<String, Value>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub high_low: String,
    pub source_url: String,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarterlyResult {
    pub period_end: String,
    pub revenue: Option<f64>,
    pub profit_before_tax: Option<f64>,
    pub profit_after_tax: Option<f64>,
    pub eps: Option<f64>,
    pub audited: String,
    pub consolidated: String,
}

/// Latest-quarter shareholding breakdown, category -> percent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shareholding {
    pub as_of: String,
    pub breakdown: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorporateAction {
    pub date: String,
    pub action: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Announcement {
    pub date: String,
    pub subject: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    pub title: String,
    pub publisher: String,
    pub link: String,
    /// Unix seconds
    pub published: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Daily closes for charting, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceHistory {
    pub dates: Vec<String>,
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_sets_identity_only() {
        let record = StockRecord::new("NSE India", "reliance", Exchange::Nse);
        assert_eq!(record.basic_info.ticker, "RELIANCE");
        assert_eq!(record.basic_info.exchange, "NSE");
        assert_eq!(record.provider, "NSE India");
        assert!(!record.has_data());
    }

    #[test]
    fn test_has_data_with_price() {
        let mut record = StockRecord::new("Tickertape", "TCS", Exchange::Nse);
        record.price_info.current_price = Some(3900.0);
        assert!(record.has_data());
    }

    #[test]
    fn test_serialized_record_is_fully_shaped() {
        let record = StockRecord::default();
        let json = serde_json::to_value(&record).unwrap();
        for key in [
            "basic_info",
            "price_info",
            "valuation",
            "financials",
            "per_share",
            "dividends",
            "analyst_data",
            "ownership",
            "trading_info",
            "screener_data",
            "quarterly_results",
            "shareholding",
            "news",
            "price_history",
            "provider",
        ] {
            assert!(json.get(key).is_some(), "missing section {}", key);
        }
        assert!(json["valuation"].get("pe_ratio").is_some());
        assert!(json["valuation"]["pe_ratio"].is_null());
    }

    #[test]
    fn test_partial_json_deserializes_with_defaults() {
        let record: StockRecord = serde_json::from_str(
            r#"{"price_info": {"current_price": 1400}, "provider": "Tickertape"}"#,
        )
        .unwrap();
        assert_eq!(record.price_info.current_price, Some(1400.0));
        assert_eq!(record.valuation.pe_ratio, None);
        assert!(record.news.is_empty());
    }
}
