use std::sync::Arc;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};
use axum::{
    extract::{Query, State},
    routing::{get, post, put},
    Json, Router,
};
use permabullish_market_data::{Fundamentals, ProviderStatus};
use permabullish_storage_sqlite::DEFAULT_MAX_AGE_DAYS;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct AdminQuery {
    secret: Option<String>,
    days: Option<i64>,
}

#[derive(Serialize)]
struct ProviderStatusResponse {
    providers: Vec<ProviderStatus>,
}

#[derive(Serialize)]
struct ResetResponse {
    message: String,
    providers: Vec<ProviderStatus>,
}

#[derive(Serialize)]
struct StaleResponse {
    days: i64,
    symbols: Vec<String>,
}

/// Admin routes are closed unless a secret is configured and matches.
fn authorize(state: &AppState, query: &AdminQuery) -> ApiResult<()> {
    match (&state.admin_secret, &query.secret) {
        (Some(expected), Some(given)) if expected == given => Ok(()),
        _ => Err(ApiError::Forbidden("Invalid admin secret".to_string())),
    }
}

async fn provider_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> ApiResult<Json<ProviderStatusResponse>> {
    authorize(&state, &query)?;
    Ok(Json(ProviderStatusResponse {
        providers: state.registry.get_provider_status(),
    }))
}

async fn reset_rate_limits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> ApiResult<Json<ResetResponse>> {
    authorize(&state, &query)?;
    state.registry.reset_rate_limits();
    tracing::info!("Provider rate limits reset by admin request");
    Ok(Json(ResetResponse {
        message: "Rate limits reset".to_string(),
        providers: state.registry.get_provider_status(),
    }))
}

async fn save_fundamentals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
    Json(fundamentals): Json<Fundamentals>,
) -> ApiResult<Json<Fundamentals>> {
    authorize(&state, &query)?;
    let saved = state.fundamentals.save_fundamentals(fundamentals).await?;
    tracing::info!("Stored fundamentals for {}", saved.symbol);
    Ok(Json(saved))
}

async fn stale_fundamentals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> ApiResult<Json<StaleResponse>> {
    authorize(&state, &query)?;
    let days = query.days.unwrap_or(DEFAULT_MAX_AGE_DAYS);
    if days < 0 {
        return Err(ApiError::BadRequest("days must not be negative".to_string()));
    }
    let symbols = state.fundamentals.get_stale_symbols(days)?;
    Ok(Json(StaleResponse { days, symbols }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/provider-status", get(provider_status))
        .route("/admin/reset-rate-limits", post(reset_rate_limits))
        .route("/admin/fundamentals", put(save_fundamentals))
        .route("/admin/fundamentals/stale", get(stale_fundamentals))
}
