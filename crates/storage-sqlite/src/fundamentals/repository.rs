use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use permabullish_market_data::{Exchange, Fundamentals, FundamentalsStore, MarketDataError, SearchResult};

use super::model::FundamentalsDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::{Result, StorageError};
use crate::schema::stock_fundamentals;
use crate::schema::stock_fundamentals::dsl::*;

/// Default freshness window for scraped fundamentals.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

pub struct FundamentalsRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl FundamentalsRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        FundamentalsRepository { pool, writer }
    }

    /// Stored row for `ticker`, case-insensitive.
    pub fn get_fundamentals(&self, ticker: &str) -> Result<Option<Fundamentals>> {
        let mut conn = get_connection(&self.pool)?;
        let row = stock_fundamentals
            .find(normalize(ticker))
            .select(FundamentalsDB::as_select())
            .first::<FundamentalsDB>(&mut conn)
            .optional()?;
        row.map(Fundamentals::try_from).transpose()
    }

    /// Insert or replace the row for `fundamentals.symbol`, stamping it now.
    pub async fn save_fundamentals(&self, fundamentals: Fundamentals) -> Result<Fundamentals> {
        self.save_fundamentals_at(fundamentals, Utc::now()).await
    }

    /// Insert or replace the row, stamping it with `updated_at`.
    pub async fn save_fundamentals_at(
        &self,
        fundamentals: Fundamentals,
        updated_at: DateTime<Utc>,
    ) -> Result<Fundamentals> {
        let row = FundamentalsDB::from_domain(&fundamentals, updated_at)?;
        if row.symbol.is_empty() {
            return Err(StorageError::InvalidData(
                "fundamentals row without a symbol".to_string(),
            ));
        }

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Fundamentals> {
                diesel::insert_into(stock_fundamentals::table)
                    .values(&row)
                    .on_conflict(stock_fundamentals::symbol)
                    .do_update()
                    .set(&row)
                    .execute(conn)?;
                debug!("Saved fundamentals for {}", row.symbol);
                Fundamentals::try_from(row)
            })
            .await
    }

    /// Symbols whose row is older than `days`, oldest first.
    pub fn get_stale_symbols(&self, days: i64) -> Result<Vec<String>> {
        let cutoff = (Utc::now() - Duration::days(days)).naive_utc();
        let mut conn = get_connection(&self.pool)?;
        Ok(stock_fundamentals
            .filter(last_updated.lt(cutoff))
            .order(last_updated.asc())
            .select(symbol)
            .load::<String>(&mut conn)?)
    }

    /// The given symbols that have no stored row, in input order.
    pub fn get_missing_symbols(&self, symbols: &[String]) -> Result<Vec<String>> {
        let wanted: Vec<String> = symbols.iter().map(|s| normalize(s)).collect();
        let mut conn = get_connection(&self.pool)?;
        let present = stock_fundamentals
            .filter(symbol.eq_any(wanted.clone()))
            .select(symbol)
            .load::<String>(&mut conn)?;
        Ok(wanted
            .into_iter()
            .filter(|s| !present.contains(s))
            .collect())
    }

    pub fn count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        Ok(stock_fundamentals.count().get_result(&mut conn)?)
    }

    /// True when the row exists and was refreshed within `max_age_days`.
    pub fn is_fresh(&self, ticker: &str, max_age_days: i64) -> Result<bool> {
        Ok(self
            .get_fundamentals(ticker)?
            .map(|f| f.is_fresh_at(Utc::now(), Duration::days(max_age_days)))
            .unwrap_or(false))
    }

    /// Case-insensitive substring match on symbol or company name.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(query));
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let mut conn = get_connection(&self.pool)?;
        let rows = stock_fundamentals
            .filter(
                symbol
                    .like(&pattern)
                    .escape('\\')
                    .or(company_name.like(&pattern).escape('\\')),
            )
            .order(symbol.asc())
            .limit(limit)
            .select((symbol, company_name))
            .load::<(String, Option<String>)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(ticker, name)| {
                let name = name.unwrap_or_else(|| ticker.clone());
                SearchResult::new(ticker, name, Exchange::Nse.as_str())
            })
            .collect())
    }
}

impl FundamentalsStore for FundamentalsRepository {
    fn get_cached_fundamentals(
        &self,
        ticker: &str,
    ) -> std::result::Result<Option<Fundamentals>, MarketDataError> {
        Ok(self.get_fundamentals(ticker)?)
    }

    fn search_fundamentals(
        &self,
        query: &str,
        limit: usize,
    ) -> std::result::Result<Vec<SearchResult>, MarketDataError> {
        Ok(self.search(query, limit)?)
    }
}

fn normalize(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use serde_json::json;
    use tempfile::tempdir;

    async fn create_test_repository() -> (FundamentalsRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = create_pool(&db_path_str).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone()).expect("Failed to spawn writer");

        (FundamentalsRepository::new(pool, writer), temp_dir)
    }

    fn reliance() -> Fundamentals {
        Fundamentals {
            symbol: "reliance".to_string(),
            company_name: Some("Reliance Industries Ltd".to_string()),
            sector: Some("Energy".to_string()),
            market_cap: Some(189_000.0),
            pe_ratio: Some(24.5),
            quarterly_results: vec![json!({"period": "Dec 2024", "sales": 243865})],
            ratios: [("Debt to equity".to_string(), json!(0.44))].into(),
            pros: vec!["Strong cash flows".to_string()],
            source_url: Some("https://www.screener.in/company/RELIANCE/".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_and_get_round_trip_is_case_insensitive() {
        let (repo, _temp_dir) = create_test_repository().await;

        let saved = repo.save_fundamentals(reliance()).await.unwrap();
        assert_eq!(saved.symbol, "RELIANCE");
        assert!(saved.last_updated.is_some());

        let loaded = repo.get_fundamentals(" Reliance ").unwrap().unwrap();
        assert_eq!(loaded.pe_ratio, Some(24.5));
        assert_eq!(loaded.pros, vec!["Strong cash flows"]);
        assert_eq!(loaded.quarterly_results.len(), 1);
        assert_eq!(loaded.ratios["Debt to equity"], json!(0.44));
        assert!(loaded.cons.is_empty());

        assert!(repo.get_fundamentals("TCS").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_existing_row() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.save_fundamentals(reliance()).await.unwrap();

        let mut updated = reliance();
        updated.pe_ratio = Some(26.0);
        updated.sector = None;
        repo.save_fundamentals(updated).await.unwrap();

        let loaded = repo.get_fundamentals("RELIANCE").unwrap().unwrap();
        assert_eq!(loaded.pe_ratio, Some(26.0));
        assert_eq!(loaded.sector, None);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stale_and_fresh() {
        let (repo, _temp_dir) = create_test_repository().await;
        let now = Utc::now();

        let mut tcs = reliance();
        tcs.symbol = "TCS".to_string();
        let mut infy = reliance();
        infy.symbol = "INFY".to_string();

        repo.save_fundamentals_at(tcs, now - Duration::days(40))
            .await
            .unwrap();
        repo.save_fundamentals_at(infy, now - Duration::days(90))
            .await
            .unwrap();
        repo.save_fundamentals(reliance()).await.unwrap();

        assert_eq!(repo.get_stale_symbols(30).unwrap(), vec!["INFY", "TCS"]);
        assert_eq!(repo.get_stale_symbols(60).unwrap(), vec!["INFY"]);

        assert!(repo.is_fresh("reliance", DEFAULT_MAX_AGE_DAYS).unwrap());
        assert!(!repo.is_fresh("TCS", DEFAULT_MAX_AGE_DAYS).unwrap());
        assert!(repo.is_fresh("TCS", 45).unwrap());
        assert!(!repo.is_fresh("WIPRO", DEFAULT_MAX_AGE_DAYS).unwrap());
    }

    #[tokio::test]
    async fn test_missing_symbols() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.save_fundamentals(reliance()).await.unwrap();

        let missing = repo
            .get_missing_symbols(&["tcs".to_string(), "RELIANCE".to_string(), "INFY".to_string()])
            .unwrap();
        assert_eq!(missing, vec!["TCS", "INFY"]);
    }

    #[tokio::test]
    async fn test_search_matches_symbol_or_company_name() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.save_fundamentals(reliance()).await.unwrap();
        repo.save_fundamentals(Fundamentals {
            symbol: "RPOWER".to_string(),
            company_name: Some("Reliance Power Ltd".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        repo.save_fundamentals(Fundamentals {
            symbol: "TCS".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

        let results = repo.search("reliance", 10).unwrap();
        let symbols: Vec<&str> = results.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["RELIANCE", "RPOWER"]);
        assert_eq!(results[0].exchange, "NSE");

        assert_eq!(repo.search("reliance", 1).unwrap().len(), 1);
        assert_eq!(repo.search("tcs", 10).unwrap()[0].name, "TCS");
        assert!(repo.search("%", 10).unwrap().is_empty());
        assert!(repo.search("  ", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_trait_feeds_record_merge() {
        let (repo, _temp_dir) = create_test_repository().await;
        repo.save_fundamentals(reliance()).await.unwrap();

        let store: &dyn FundamentalsStore = &repo;
        let fundamentals = store.get_cached_fundamentals("RELIANCE").unwrap().unwrap();
        let record = fundamentals.to_record();
        assert_eq!(record.valuation.pe_ratio, Some(24.5));
        assert_eq!(record.valuation.market_cap, Some(1.89e12));
        assert_eq!(store.search_fundamentals("rel", 10).unwrap().len(), 1);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("TCS"), "TCS");
    }
}
