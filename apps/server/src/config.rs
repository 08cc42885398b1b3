use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use permabullish_market_data::MarketDataConfig;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    pub request_timeout: Duration,
    /// Admin routes answer 403 unless the request carries this secret.
    pub admin_secret: Option<String>,
    pub alpha_vantage_api_key: Option<String>,
    pub stock_cache_ttl: Option<Duration>,
    pub provider_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            db_path: "./db/app.db".into(),
            cors_allow: vec!["*".into()],
            request_timeout: Duration::from_millis(30000),
            admin_secret: None,
            alpha_vantage_api_key: None,
            stock_cache_ttl: None,
            provider_timeout: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let listen_addr: SocketAddr = std::env::var("PB_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("Invalid PB_LISTEN_ADDR")?;
        let db_path = std::env::var("PB_DB_PATH").unwrap_or_else(|_| "./db/app.db".into());
        let cors_allow = std::env::var("PB_CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let timeout_ms: u64 = std::env::var("PB_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| "30000".into())
            .parse()
            .unwrap_or(30000);
        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(timeout_ms),
            admin_secret: non_empty_var("PB_ADMIN_SECRET"),
            alpha_vantage_api_key: non_empty_var("ALPHA_VANTAGE_API_KEY"),
            stock_cache_ttl: secs_var("PB_STOCK_CACHE_TTL_SECS"),
            provider_timeout: secs_var("PB_PROVIDER_TIMEOUT_SECS"),
        })
    }

    /// Library settings derived from the environment overrides.
    pub fn market_data_config(&self) -> MarketDataConfig {
        let mut config = MarketDataConfig::default();
        if let Some(key) = &self.alpha_vantage_api_key {
            config = config.with_alpha_vantage_key(key.clone());
        }
        if let Some(ttl) = self.stock_cache_ttl {
            config = config.with_stock_ttl(ttl);
        }
        if let Some(timeout) = self.provider_timeout {
            config = config.with_provider_timeout(timeout);
        }
        config
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secs_var(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
