//! Rows of the local fundamentals store.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::StockRecord;

/// Rupees per crore. The store keeps market cap in crores, as scraped.
const CRORE: f64 = 1e7;

/// Previously scraped fundamentals for one symbol.
///
/// The flat ratio columns mirror the store's table; the statement tables and
/// shareholding history are kept as the JSON rows the scraper emitted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fundamentals {
    pub symbol: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,

    /// In crores of rupees.
    pub market_cap: Option<f64>,
    pub current_price: Option<f64>,
    /// Free text such as "1,608 / 1,115"
    pub high_low: Option<String>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub roe: Option<f64>,
    pub roce: Option<f64>,
    pub book_value: Option<f64>,
    pub face_value: Option<f64>,

    pub quarterly_results: Vec<Value>,
    pub profit_loss: Vec<Value>,
    pub balance_sheet: Vec<Value>,
    pub cash_flow: Vec<Value>,
    pub shareholding: Vec<Value>,
    pub ratios: BTreeMap<String, Value>,

    pub pros: Vec<String>,
    pub cons: Vec<String>,

    pub source_url: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Fundamentals {
    /// Project the flat row onto record sections so it can be merged with
    /// [`Backfill`](crate::enrichment::Backfill).
    ///
    /// The returned record has no provider name; the merge never copies it.
    pub fn to_record(&self) -> StockRecord {
        let mut record = StockRecord::default();

        let basic = &mut record.basic_info;
        basic.ticker = self.symbol.to_uppercase();
        basic.company_name = self.company_name.clone().unwrap_or_default();
        basic.sector = self.sector.clone().unwrap_or_default();
        basic.industry = self.industry.clone().unwrap_or_default();

        record.price_info.current_price = self.current_price;

        let valuation = &mut record.valuation;
        valuation.market_cap = self.market_cap.map(|crores| crores * CRORE);
        valuation.pe_ratio = self.pe_ratio;
        valuation.pb_ratio = self.pb_ratio;
        valuation.dividend_yield = self.dividend_yield;
        valuation.face_value = self.face_value;

        record.financials.roe = self.roe;
        record.financials.roce = self.roce;
        record.per_share.book_value = self.book_value;

        let screener = &mut record.screener_data;
        screener.quarterly_results = self.quarterly_results.clone();
        screener.profit_loss = self.profit_loss.clone();
        screener.balance_sheet = self.balance_sheet.clone();
        screener.cash_flow = self.cash_flow.clone();
        screener.shareholding = self.shareholding.clone();
        screener.ratios = self.ratios.clone();
        screener.pros = self.pros.clone();
        screener.cons = self.cons.clone();
        screener.high_low = self.high_low.clone().unwrap_or_default();
        screener.source_url = self.source_url.clone().unwrap_or_default();
        screener.last_updated = self.last_updated;

        record
    }

    /// True when the row was refreshed within `max_age` of `now`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.last_updated
            .map(|updated| now - updated < max_age)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_record_maps_ratios_into_sections() {
        let fundamentals = Fundamentals {
            symbol: "reliance".to_string(),
            company_name: Some("Reliance Industries Ltd".to_string()),
            market_cap: Some(189_000.0),
            pe_ratio: Some(24.5),
            roce: Some(9.7),
            book_value: Some(605.0),
            pros: vec!["Strong cash flows".to_string()],
            quarterly_results: vec![json!({"period": "Dec 2024", "sales": 243865})],
            ..Default::default()
        };

        let record = fundamentals.to_record();
        assert_eq!(record.basic_info.ticker, "RELIANCE");
        assert_eq!(record.basic_info.company_name, "Reliance Industries Ltd");
        assert_eq!(record.valuation.pe_ratio, Some(24.5));
        assert_eq!(record.valuation.market_cap, Some(1.89e12));
        assert_eq!(record.financials.roce, Some(9.7));
        assert_eq!(record.per_share.book_value, Some(605.0));
        assert_eq!(record.screener_data.pros, vec!["Strong cash flows"]);
        assert_eq!(record.screener_data.quarterly_results.len(), 1);
        assert!(record.provider.is_empty());
    }

    #[test]
    fn test_is_fresh_at() {
        let now = Utc::now();
        let mut fundamentals = Fundamentals {
            last_updated: Some(now - Duration::days(10)),
            ..Default::default()
        };
        assert!(fundamentals.is_fresh_at(now, Duration::days(30)));
        assert!(!fundamentals.is_fresh_at(now, Duration::days(7)));

        fundamentals.last_updated = None;
        assert!(!fundamentals.is_fresh_at(now, Duration::days(30)));
    }

    #[test]
    fn test_minimal_json_row() {
        let fundamentals: Fundamentals =
            serde_json::from_str(r#"{"symbol": "RELIANCE", "pe_ratio": 24.5, "pros": ["Strong cash flows"]}"#)
                .unwrap();
        assert_eq!(fundamentals.pe_ratio, Some(24.5));
        assert!(fundamentals.cons.is_empty());
    }
}
