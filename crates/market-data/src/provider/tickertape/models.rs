//! Tickertape API response models.

use serde::Deserialize;

use crate::provider::http::lenient_f64;

/// Every Tickertape endpoint wraps its payload in `{success, data}`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
}

/// `GET /search?text=`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchData {
    pub stocks: Vec<SearchStock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchStock {
    pub sid: String,
    pub ticker: String,
    pub name: String,
    /// Page path, e.g. "/stocks/reliance-industries-RELI".
    pub slug: String,
    /// "EXACT" when the query matched the ticker exactly.
    #[serde(rename = "match")]
    pub match_kind: String,
    pub sector: String,
}

impl SearchStock {
    /// Security id: the `sid` field, or the last dash segment of the slug.
    pub fn security_id(&self) -> Option<String> {
        if !self.sid.trim().is_empty() {
            return Some(self.sid.trim().to_string());
        }
        let slug = self.slug.strip_prefix("/stocks/").unwrap_or(&self.slug);
        slug.rsplit('-')
            .next()
            .filter(|sid| !sid.is_empty())
            .map(str::to_string)
    }
}

/// `GET /stocks/info/{sid}`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StockInfoData {
    pub sid: String,
    pub info: StockInfo,
    pub ratios: StockRatios,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockInfo {
    pub name: String,
    pub ticker: String,
    pub sector: String,
    pub description: String,
    pub isin: String,
}

/// Key ratios. Market cap is in crores; yields and returns in percent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockRatios {
    #[serde(deserialize_with = "lenient_f64")]
    pub market_cap: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub pe: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub pb: Option<f64>,
    #[serde(rename = "indpe", deserialize_with = "lenient_f64")]
    pub sector_pe: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub div_yield: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub roe: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub eps: Option<f64>,
    #[serde(rename = "52wHigh", deserialize_with = "lenient_f64")]
    pub high_52w: Option<f64>,
    #[serde(rename = "52wLow", deserialize_with = "lenient_f64")]
    pub low_52w: Option<f64>,
}

/// One element of `GET quotes?sids=`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LiveQuote {
    pub sid: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub close: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub open: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub high: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub low: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub change: Option<f64>,
    #[serde(rename = "dyChange", deserialize_with = "lenient_f64")]
    pub change_percent: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_search() {
        let json = r#"{"success": true, "data": {"stocks": [
            {"sid": "RELI", "ticker": "RELIANCE", "name": "Reliance Industries Ltd",
             "slug": "/stocks/reliance-industries-RELI", "match": "EXACT", "sector": "Energy"},
            {"ticker": "RPOWER", "name": "Reliance Power Ltd", "slug": "/stocks/reliance-power-RPOL"}
        ]}}"#;
        let envelope: Envelope<SearchData> = serde_json::from_str(json).unwrap();
        assert!(envelope.success);
        let stocks = envelope.data.unwrap().stocks;
        assert_eq!(stocks[0].match_kind, "EXACT");
        assert_eq!(stocks[0].security_id().as_deref(), Some("RELI"));
        assert_eq!(stocks[1].security_id().as_deref(), Some("RPOL"));
    }

    #[test]
    fn test_security_id_missing() {
        let stock = SearchStock::default();
        assert_eq!(stock.security_id(), None);
    }

    #[test]
    fn test_deserialize_info() {
        let json = r#"{"success": true, "data": {"sid": "RELI",
            "info": {"name": "Reliance Industries Ltd", "ticker": "RELIANCE", "sector": "Energy",
                     "description": "Conglomerate"},
            "ratios": {"marketCap": 1894523.5, "pe": "24.1", "pb": 2.3, "indpe": 19.7,
                       "divYield": 0.36, "roe": 8.9, "52wHigh": 1608.8, "52wLow": 1115.55}}}"#;
        let envelope: Envelope<StockInfoData> = serde_json::from_str(json).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.info.name, "Reliance Industries Ltd");
        assert_eq!(data.ratios.pe, Some(24.1));
        assert_eq!(data.ratios.sector_pe, Some(19.7));
        assert_eq!(data.ratios.high_52w, Some(1608.8));
    }

    #[test]
    fn test_deserialize_quotes() {
        let json = r#"{"success": true, "data": [
            {"sid": "RELI", "price": 1400, "close": 1391.2, "change": 8.8, "dyChange": 0.63,
             "high": 1405, "low": 1390.1, "volume": 8123456}
        ]}"#;
        let envelope: Envelope<Vec<LiveQuote>> = serde_json::from_str(json).unwrap();
        let quote = &envelope.data.unwrap()[0];
        assert_eq!(quote.price, Some(1400.0));
        assert_eq!(quote.change_percent, Some(0.63));
        assert_eq!(quote.open, None);
    }

    #[test]
    fn test_failure_envelope() {
        let envelope: Envelope<SearchData> =
            serde_json::from_str(r#"{"success": false, "data": null}"#).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
    }
}
