use std::sync::Arc;

use crate::config::Config;
use permabullish_market_data::{build_default_providers, ProviderRegistry, StockDataProvider};
use permabullish_storage_sqlite::{db, FundamentalsRepository};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub registry: Arc<ProviderRegistry>,
    pub fundamentals: Arc<FundamentalsRepository>,
    pub admin_secret: Option<String>,
    pub db_path: String,
}

pub fn init_tracing() {
    let log_format = std::env::var("PB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Build the state with the live providers.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let providers = build_default_providers(&config.market_data_config()).await?;
    build_state_with_providers(config, providers).await
}

/// Build the state around an explicit provider list (highest priority first).
pub async fn build_state_with_providers(
    config: &Config,
    providers: Vec<Arc<dyn StockDataProvider>>,
) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone())?;

    let fundamentals = Arc::new(FundamentalsRepository::new(pool.clone(), writer));
    tracing::info!(
        "Local fundamentals store holds {} symbols",
        fundamentals.count()?
    );

    let provider_ids: Vec<&str> = providers.iter().map(|p| p.id()).collect();
    tracing::info!("Stock data providers: {}", provider_ids.join(" -> "));

    let registry = Arc::new(
        ProviderRegistry::new(providers, config.market_data_config())
            .with_store(fundamentals.clone()),
    );

    Ok(Arc::new(AppState {
        registry,
        fundamentals,
        admin_secret: config.admin_secret.clone(),
        db_path,
    }))
}
