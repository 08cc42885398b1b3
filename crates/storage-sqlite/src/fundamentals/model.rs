//! Database models for stock fundamentals.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use permabullish_market_data::Fundamentals;

use crate::errors::Result;

/// Database model for one `stock_fundamentals` row.
///
/// Statement tables, ratios and pros/cons are stored as JSON text.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::stock_fundamentals)]
#[diesel(primary_key(symbol))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FundamentalsDB {
    pub symbol: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub current_price: Option<f64>,
    pub high_low: Option<String>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub roe: Option<f64>,
    pub roce: Option<f64>,
    pub book_value: Option<f64>,
    pub face_value: Option<f64>,
    pub quarterly_results: String,
    pub profit_loss: String,
    pub balance_sheet: String,
    pub cash_flow: String,
    pub shareholding: String,
    pub ratios: String,
    pub pros: String,
    pub cons: String,
    pub source_url: Option<String>,
    pub last_updated: NaiveDateTime,
}

impl FundamentalsDB {
    /// Build a row from the domain model, stamping `updated_at`.
    ///
    /// The symbol is upper-cased; lookups are keyed the same way.
    pub fn from_domain(fundamentals: &Fundamentals, updated_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            symbol: fundamentals.symbol.trim().to_uppercase(),
            company_name: fundamentals.company_name.clone(),
            sector: fundamentals.sector.clone(),
            industry: fundamentals.industry.clone(),
            market_cap: fundamentals.market_cap,
            current_price: fundamentals.current_price,
            high_low: fundamentals.high_low.clone(),
            pe_ratio: fundamentals.pe_ratio,
            pb_ratio: fundamentals.pb_ratio,
            dividend_yield: fundamentals.dividend_yield,
            roe: fundamentals.roe,
            roce: fundamentals.roce,
            book_value: fundamentals.book_value,
            face_value: fundamentals.face_value,
            quarterly_results: serde_json::to_string(&fundamentals.quarterly_results)?,
            profit_loss: serde_json::to_string(&fundamentals.profit_loss)?,
            balance_sheet: serde_json::to_string(&fundamentals.balance_sheet)?,
            cash_flow: serde_json::to_string(&fundamentals.cash_flow)?,
            shareholding: serde_json::to_string(&fundamentals.shareholding)?,
            ratios: serde_json::to_string(&fundamentals.ratios)?,
            pros: serde_json::to_string(&fundamentals.pros)?,
            cons: serde_json::to_string(&fundamentals.cons)?,
            source_url: fundamentals.source_url.clone(),
            last_updated: updated_at.naive_utc(),
        })
    }
}

impl TryFrom<FundamentalsDB> for Fundamentals {
    type Error = crate::errors::StorageError;

    fn try_from(db: FundamentalsDB) -> Result<Self> {
        Ok(Self {
            symbol: db.symbol,
            company_name: db.company_name,
            sector: db.sector,
            industry: db.industry,
            market_cap: db.market_cap,
            current_price: db.current_price,
            high_low: db.high_low,
            pe_ratio: db.pe_ratio,
            pb_ratio: db.pb_ratio,
            dividend_yield: db.dividend_yield,
            roe: db.roe,
            roce: db.roce,
            book_value: db.book_value,
            face_value: db.face_value,
            quarterly_results: serde_json::from_str(&db.quarterly_results)?,
            profit_loss: serde_json::from_str(&db.profit_loss)?,
            balance_sheet: serde_json::from_str(&db.balance_sheet)?,
            cash_flow: serde_json::from_str(&db.cash_flow)?,
            shareholding: serde_json::from_str(&db.shareholding)?,
            ratios: serde_json::from_str(&db.ratios)?,
            pros: serde_json::from_str(&db.pros)?,
            cons: serde_json::from_str(&db.cons)?,
            source_url: db.source_url,
            last_updated: Some(db.last_updated.and_utc()),
        })
    }
}
