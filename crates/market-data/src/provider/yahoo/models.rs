//! Yahoo Finance API response models.
//!
//! quoteSummary wraps most numbers as `{"raw": 123.45, "fmt": "123.45"}`, or
//! as an empty object `{}` when there is no value.

use serde::Deserialize;

/// Main response wrapper for quoteSummary API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YahooQuoteSummaryResponse {
    pub quote_summary: YahooQuoteSummary,
}

/// Quote summary container. `result` is null when Yahoo reports an error.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct YahooQuoteSummary {
    pub result: Option<Vec<YahooQuoteSummaryResult>>,
}

/// Individual result from quoteSummary API
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YahooQuoteSummaryResult {
    pub price: Option<YahooPriceData>,
    pub summary_profile: Option<YahooSummaryProfile>,
    pub summary_detail: Option<YahooSummaryDetail>,
    pub default_key_statistics: Option<YahooKeyStatistics>,
    pub financial_data: Option<YahooFinancialData>,
}

impl YahooQuoteSummaryResult {
    /// Yahoo returns a result for delisted tickers too; only a market price counts.
    pub fn has_market_price(&self) -> bool {
        self.price
            .as_ref()
            .and_then(|p| raw(&p.regular_market_price))
            .is_some()
    }
}

/// Price data from quoteSummary API
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YahooPriceData {
    pub currency: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub quote_type: Option<String>,
    pub regular_market_price: Option<YahooPriceDetail>,
    pub regular_market_previous_close: Option<YahooPriceDetail>,
    pub regular_market_open: Option<YahooPriceDetail>,
    pub regular_market_day_high: Option<YahooPriceDetail>,
    pub regular_market_day_low: Option<YahooPriceDetail>,
    pub regular_market_volume: Option<YahooPriceDetail>,
    pub regular_market_change: Option<YahooPriceDetail>,
    /// Fraction, e.g. 0.0063 for +0.63%.
    pub regular_market_change_percent: Option<YahooPriceDetail>,
    pub market_cap: Option<YahooPriceDetail>,
}

/// Price detail with raw and formatted values
#[derive(Debug, Default, Deserialize, Clone)]
pub struct YahooPriceDetail {
    pub raw: Option<f64>,
}

/// `raw` of an optional wrapped value.
pub fn raw(detail: &Option<YahooPriceDetail>) -> Option<f64> {
    detail.as_ref().and_then(|d| d.raw).filter(|v| v.is_finite())
}

/// Summary profile data (company info)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YahooSummaryProfile {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub long_business_summary: Option<String>,
    pub country: Option<String>,
    pub full_time_employees: Option<u64>,
}

/// Summary detail data (trading and dividend metrics)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YahooSummaryDetail {
    pub previous_close: Option<YahooPriceDetail>,
    pub open: Option<YahooPriceDetail>,
    pub day_high: Option<YahooPriceDetail>,
    pub day_low: Option<YahooPriceDetail>,
    pub volume: Option<YahooPriceDetail>,
    pub average_volume: Option<YahooPriceDetail>,
    pub market_cap: Option<YahooPriceDetail>,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<YahooPriceDetail>,
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<YahooPriceDetail>,
    pub price_to_sales_trailing12_months: Option<YahooPriceDetail>,
    pub dividend_rate: Option<YahooPriceDetail>,
    pub dividend_yield: Option<YahooPriceDetail>,
    pub payout_ratio: Option<YahooPriceDetail>,
    /// Unix seconds.
    pub ex_dividend_date: Option<YahooPriceDetail>,
    pub fifty_two_week_high: Option<YahooPriceDetail>,
    pub fifty_two_week_low: Option<YahooPriceDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YahooKeyStatistics {
    pub enterprise_value: Option<YahooPriceDetail>,
    pub forward_pe: Option<YahooPriceDetail>,
    pub peg_ratio: Option<YahooPriceDetail>,
    pub price_to_book: Option<YahooPriceDetail>,
    pub enterprise_to_revenue: Option<YahooPriceDetail>,
    pub enterprise_to_ebitda: Option<YahooPriceDetail>,
    pub trailing_eps: Option<YahooPriceDetail>,
    pub forward_eps: Option<YahooPriceDetail>,
    pub book_value: Option<YahooPriceDetail>,
    pub net_income_to_common: Option<YahooPriceDetail>,
    pub held_percent_insiders: Option<YahooPriceDetail>,
    pub held_percent_institutions: Option<YahooPriceDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YahooFinancialData {
    pub current_price: Option<YahooPriceDetail>,
    pub target_high_price: Option<YahooPriceDetail>,
    pub target_low_price: Option<YahooPriceDetail>,
    pub target_mean_price: Option<YahooPriceDetail>,
    pub recommendation_key: Option<String>,
    pub number_of_analyst_opinions: Option<YahooPriceDetail>,
    pub total_revenue: Option<YahooPriceDetail>,
    pub revenue_growth: Option<YahooPriceDetail>,
    pub revenue_per_share: Option<YahooPriceDetail>,
    pub gross_profits: Option<YahooPriceDetail>,
    pub ebitda: Option<YahooPriceDetail>,
    pub gross_margins: Option<YahooPriceDetail>,
    pub operating_margins: Option<YahooPriceDetail>,
    pub profit_margins: Option<YahooPriceDetail>,
    pub ebitda_margins: Option<YahooPriceDetail>,
    pub return_on_equity: Option<YahooPriceDetail>,
    pub return_on_assets: Option<YahooPriceDetail>,
    pub debt_to_equity: Option<YahooPriceDetail>,
    pub current_ratio: Option<YahooPriceDetail>,
    pub quick_ratio: Option<YahooPriceDetail>,
    pub total_cash: Option<YahooPriceDetail>,
    pub total_debt: Option<YahooPriceDetail>,
}

/// `v1/finance/search?q=&newsCount=` (news part only).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct YahooNewsResponse {
    pub news: Vec<YahooNewsItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YahooNewsItem {
    pub title: String,
    pub publisher: String,
    pub link: String,
    pub provider_publish_time: Option<i64>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_price_detail() {
        let json = r#"{"raw": 150.25, "fmt": "150.25"}"#;
        let detail: YahooPriceDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.raw, Some(150.25));
    }

    #[test]
    fn test_deserialize_price_detail_empty_object() {
        let detail: YahooPriceDetail = serde_json::from_str("{}").unwrap();
        assert_eq!(detail.raw, None);
    }

    #[test]
    fn test_deserialize_error_result() {
        let json = r#"{"quoteSummary": {"result": null,
            "error": {"code": "Not Found", "description": "Quote not found for symbol: NOPE.NS"}}}"#;
        let response: YahooQuoteSummaryResponse = serde_json::from_str(json).unwrap();
        assert!(response.quote_summary.result.is_none());
    }

    #[test]
    fn test_deserialize_full_result() {
        let json = r#"{"quoteSummary": {"result": [{
            "price": {"longName": "Reliance Industries Limited", "quoteType": "EQUITY",
                      "currency": "INR", "regularMarketPrice": {"raw": 1400.0, "fmt": "1,400.00"},
                      "regularMarketChangePercent": {"raw": 0.0063}},
            "summaryProfile": {"sector": "Energy", "industry": "Oil & Gas Refining & Marketing",
                               "fullTimeEmployees": 347362},
            "summaryDetail": {"trailingPE": {"raw": 24.1}, "dividendYield": {},
                              "exDividendDate": {"raw": 1723593600}},
            "defaultKeyStatistics": {"priceToBook": {"raw": 2.3}, "heldPercentInsiders": {"raw": 0.5}},
            "financialData": {"recommendationKey": "buy", "numberOfAnalystOpinions": {"raw": 32},
                              "returnOnEquity": {"raw": 0.089}}
        }], "error": null}}"#;
        let response: YahooQuoteSummaryResponse = serde_json::from_str(json).unwrap();
        let result = response.quote_summary.result.unwrap().remove(0);
        assert!(result.has_market_price());

        let detail = result.summary_detail.unwrap();
        assert_eq!(raw(&detail.trailing_pe), Some(24.1));
        assert_eq!(raw(&detail.dividend_yield), None);

        let stats = result.default_key_statistics.unwrap();
        assert_eq!(raw(&stats.price_to_book), Some(2.3));

        let financial = result.financial_data.unwrap();
        assert_eq!(financial.recommendation_key.as_deref(), Some("buy"));
        assert_eq!(raw(&financial.number_of_analyst_opinions), Some(32.0));
        assert_eq!(
            result.summary_profile.unwrap().full_time_employees,
            Some(347362)
        );
    }

    #[test]
    fn test_result_without_price_has_no_market_price() {
        let result: YahooQuoteSummaryResult =
            serde_json::from_str(r#"{"price": {"regularMarketPrice": {}}}"#).unwrap();
        assert!(!result.has_market_price());
    }

    #[test]
    fn test_deserialize_news() {
        let json = r#"{"quotes": [], "news": [
            {"uuid": "x", "title": "Reliance Q3 profit rises", "publisher": "Reuters",
             "link": "https://example.com/a", "providerPublishTime": 1737360000, "type": "STORY"}
        ]}"#;
        let response: YahooNewsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.news.len(), 1);
        assert_eq!(response.news[0].provider_publish_time, Some(1737360000));
        assert_eq!(response.news[0].kind, "STORY");
    }
}
