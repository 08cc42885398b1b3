//! SQLite storage implementation for Permabullish.
//!
//! This crate provides the database-backed local fundamentals store using
//! Diesel ORM with SQLite:
//! - Database connection pooling and management
//! - Diesel migrations (embedded)
//! - A single-writer actor that serializes writes
//! - The `stock_fundamentals` repository, which implements the market data
//!   crate's `FundamentalsStore`
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//! The market data crate only knows the `FundamentalsStore` trait.
//!
//! ```text
//! market-data (registry)      server (admin ingestion)
//!       │                            │
//!       └─────────────┬──────────────┘
//!                     │
//!                     ▼
//!          storage-sqlite (this crate)
//!                     │
//!                     ▼
//!                 SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;

pub mod fundamentals;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use errors::{Result, StorageError};

pub use fundamentals::{FundamentalsDB, FundamentalsRepository, DEFAULT_MAX_AGE_DAYS};
