//! NSE India API response models.
//!
//! NSE serves numbers as JSON numbers on some endpoints and as formatted
//! strings ("1,23,456") on others, so numeric fields go through
//! [`lenient_f64`].

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::provider::http::lenient_f64;

/// `/api/quote-equity?symbol=`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NseQuoteResponse {
    pub info: Option<NseInfo>,
    pub metadata: NseMetadata,
    pub price_info: NsePriceInfo,
    pub security_info: NseSecurityInfo,
    pub industry_info: NseIndustryInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NseInfo {
    pub symbol: String,
    pub company_name: String,
    pub industry: String,
    pub isin: String,
    #[serde(rename = "isFNOSec")]
    pub is_fno_sec: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NseMetadata {
    pub pd_sector_ind: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub pd_symbol_pe: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub pd_sector_pe: Option<f64>,
    pub listing_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NsePriceInfo {
    #[serde(deserialize_with = "lenient_f64")]
    pub last_price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub previous_close: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub open: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub change: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub p_change: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub vwap: Option<f64>,
    #[serde(rename = "upperCP", deserialize_with = "lenient_f64")]
    pub upper_cp: Option<f64>,
    #[serde(rename = "lowerCP", deserialize_with = "lenient_f64")]
    pub lower_cp: Option<f64>,
    pub intra_day_high_low: NseHighLow,
    pub week_high_low: NseHighLow,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NseHighLow {
    #[serde(deserialize_with = "lenient_f64")]
    pub min: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub max: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NseSecurityInfo {
    #[serde(deserialize_with = "lenient_f64")]
    pub face_value: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub issued_size: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NseIndustryInfo {
    #[serde(rename = "macro")]
    pub macro_sector: String,
    pub sector: String,
    pub industry: String,
    #[serde(rename = "basicIndustry")]
    pub basic_industry: String,
}

/// `/api/top-corp-info?symbol=&market=equities`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NseCorpInfoResponse {
    pub financial_results: NseSection<Vec<NseFinancialResult>>,
    /// Quarter label ("31-DEC-2024") -> rows of `{category: percent}`.
    pub shareholdings_patterns: NseSection<BTreeMap<String, Vec<BTreeMap<String, Value>>>>,
    pub corporate_actions: NseSection<Vec<NseCorporateAction>>,
    pub latest_announcements: NseSection<Vec<NseAnnouncement>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NseSection<T> {
    pub data: T,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NseFinancialResult {
    pub to_date: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub income: Option<f64>,
    #[serde(rename = "reProLossBefTax", deserialize_with = "lenient_f64")]
    pub profit_before_tax: Option<f64>,
    #[serde(rename = "proLossAftTax", deserialize_with = "lenient_f64")]
    pub profit_after_tax: Option<f64>,
    #[serde(rename = "reDilEPS", deserialize_with = "lenient_f64")]
    pub diluted_eps: Option<f64>,
    pub audited: String,
    pub consolidated: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NseCorporateAction {
    pub exdate: String,
    pub purpose: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NseAnnouncement {
    pub broadcastdate: String,
    pub subject: String,
}

/// `/api/search/autocomplete?q=`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NseAutocompleteResponse {
    pub symbols: Vec<NseSymbolMatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NseSymbolMatch {
    pub symbol: String,
    pub symbol_info: String,
    pub result_sub_type: String,
}
