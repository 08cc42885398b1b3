use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use permabullish_market_data::{Exchange, FetchOutcome, SearchResult, StockRecord};
use serde::Deserialize;

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    limit: Option<usize>,
}

async fn search_stocks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SearchResult>>> {
    let q = query.q.unwrap_or_default();
    let limit = query
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    Ok(Json(state.registry.search_stocks(&q, limit).await))
}

#[derive(Deserialize)]
struct StockQuery {
    exchange: Option<String>,
}

async fn get_stock(
    Path(symbol): Path<String>,
    State(state): State<Arc<AppState>>,
    Query(query): Query<StockQuery>,
) -> ApiResult<Json<Arc<StockRecord>>> {
    let exchange = match query.exchange.as_deref().map(str::trim) {
        None | Some("") => Exchange::default(),
        Some(raw) => raw
            .parse::<Exchange>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };

    match state
        .registry
        .fetch_stock_data_detailed(&symbol, exchange)
        .await
    {
        FetchOutcome::Found(record) => Ok(Json(record)),
        FetchOutcome::NotFound => Err(ApiError::NotFound(format!(
            "No data for {}:{}",
            exchange,
            symbol.trim().to_uppercase()
        ))),
        FetchOutcome::Unavailable => Err(ApiError::ServiceUnavailable(
            "All stock data sources are unavailable, retry later".to_string(),
        )),
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stocks/search", get(search_stocks))
        .route("/stocks/{symbol}", get(get_stock))
}
