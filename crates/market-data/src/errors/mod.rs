//! Error types and failure classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for provider and store operations
//! - [`FailureKind`]: How the registry treats an absorbed provider failure

mod failure;

pub use failure::{looks_rate_limited, FailureKind};

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to stock data providers.
///
/// None of these ever escape the registry's public surface. Each one is
/// classified into a [`FailureKind`] via [`failure_kind`](Self::failure_kind)
/// and absorbed at the provider boundary.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The provider does not know the requested symbol.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider rate limited the request (HTTP 429 or an explicit notice).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider answered with a payload we could not decode.
    #[error("Failed to parse {provider} response: {message}")]
    Parse {
        /// The provider whose payload was malformed
        provider: String,
        /// Decoder message
        message: String,
    },

    /// The provider's own call budget for the day is used up.
    #[error("Daily quota exhausted: {provider}")]
    QuotaExhausted {
        /// The provider whose quota ran out
        provider: String,
    },

    /// The provider does not offer this operation.
    #[error("Operation not supported: {operation} by {provider}")]
    NotSupported {
        /// The operation that was requested (e.g., "search")
        operation: String,
        /// The provider that doesn't support it
        provider: String,
    },

    /// The local fundamentals store failed.
    #[error("Fundamentals store error: {0}")]
    Storage(String),

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns how the registry should treat this error.
    ///
    /// Structural signals win: a `RateLimited` variant or an HTTP 429 status.
    /// Only free-text errors fall back to [`looks_rate_limited`].
    ///
    /// ```
    /// use permabullish_market_data::errors::{FailureKind, MarketDataError};
    ///
    /// let error = MarketDataError::RateLimited { provider: "YAHOO".to_string() };
    /// assert_eq!(error.failure_kind(), FailureKind::RateLimited);
    ///
    /// let error = MarketDataError::SymbolNotFound("NOPE".to_string());
    /// assert_eq!(error.failure_kind(), FailureKind::NotFound);
    /// ```
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::SymbolNotFound(_) => FailureKind::NotFound,

            Self::RateLimited { .. } => FailureKind::RateLimited,

            Self::Network(e) if e.status() == Some(StatusCode::TOO_MANY_REQUESTS) => {
                FailureKind::RateLimited
            }

            Self::Timeout { .. }
            | Self::Parse { .. }
            | Self::QuotaExhausted { .. }
            | Self::NotSupported { .. }
            | Self::Storage(_) => FailureKind::Transient,

            Self::ProviderError { message, .. } => FailureKind::from_message(message),

            Self::Network(e) => FailureKind::from_message(&e.to_string()),
        }
    }

    /// Shorthand for `failure_kind() == FailureKind::RateLimited`.
    pub fn is_rate_limit(&self) -> bool {
        self.failure_kind() == FailureKind::RateLimited
    }
}
