//! SQLite storage implementation for scraped stock fundamentals.

mod model;
mod repository;

pub use model::FundamentalsDB;
pub use repository::{FundamentalsRepository, DEFAULT_MAX_AGE_DAYS};
