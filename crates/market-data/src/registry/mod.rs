//! Provider registry module.
//!
//! This module provides orchestration for stock data providers, including:
//! - Priority ordering with cooldown and exchange-coverage skips
//! - Response caching
//! - Enrichment from the most-complete provider and the fundamentals store
//! - Per-attempt diagnostics

mod provider_registry;
mod skip_reason;

pub use provider_registry::{FetchOutcome, ProviderRegistry, LOCAL_FUNDAMENTALS_SOURCE};
pub use skip_reason::{AttemptOutcome, FetchDiagnostics, ProviderAttempt, SkipReason};
