//! Storage-specific error types for SQLite operations.
//!
//! This module provides error types that wrap Diesel-specific errors and convert
//! them to the `MarketDataError::Storage` variant the market data layer expects
//! from a fundamentals store.

use diesel::result::Error as DieselError;
use permabullish_market_data::MarketDataError;
use thiserror::Error;

/// Storage-specific errors that wrap Diesel and r2d2 types.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Writer actor unavailable: {0}")]
    WriterUnavailable(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for MarketDataError {
    fn from(err: StorageError) -> Self {
        MarketDataError::Storage(err.to_string())
    }
}
