//! Skip reason tracking for provider selection diagnostics.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::errors::FailureKind;
use crate::models::{Exchange, ProviderId};

/// Why a provider was skipped during a fetch or search.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    /// Provider is in a rate-limit cooldown.
    CoolingDown { until: Option<DateTime<Utc>> },

    /// Provider doesn't serve this exchange.
    ExchangeNotCovered { exchange: Exchange },

    /// Provider doesn't offer search.
    SearchNotSupported,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::CoolingDown { .. } => f.write_str("CoolingDown"),
            SkipReason::ExchangeNotCovered { exchange } => {
                write!(f, "ExchangeNotCovered({})", exchange)
            }
            SkipReason::SearchNotSupported => f.write_str("SearchNotSupported"),
        }
    }
}

/// What happened when a provider was consulted.
#[derive(Clone, Debug, PartialEq)]
pub enum AttemptOutcome {
    Skipped(SkipReason),
    /// Failed, timed out or panicked.
    Error { kind: FailureKind, message: String },
    /// Answered, but with nothing usable.
    Empty,
    Success,
}

/// Record of a single provider attempt during a fetch.
#[derive(Clone, Debug)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    pub outcome: AttemptOutcome,
}

/// Detailed result of a fetch operation with skip diagnostics.
#[derive(Clone, Debug, Default)]
pub struct FetchDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl FetchDiagnostics {
    pub fn new() -> Self {
        Self {
            attempts: Vec::new(),
        }
    }

    fn record(&mut self, provider_id: ProviderId, outcome: AttemptOutcome) {
        self.attempts.push(ProviderAttempt {
            provider_id,
            outcome,
        });
    }

    pub fn record_skip(&mut self, provider_id: ProviderId, reason: SkipReason) {
        self.record(provider_id, AttemptOutcome::Skipped(reason));
    }

    pub fn record_error(&mut self, provider_id: ProviderId, kind: FailureKind, error: String) {
        self.record(
            provider_id,
            AttemptOutcome::Error {
                kind,
                message: error,
            },
        );
    }

    pub fn record_empty(&mut self, provider_id: ProviderId) {
        self.record(provider_id, AttemptOutcome::Empty);
    }

    pub fn record_success(&mut self, provider_id: ProviderId) {
        self.record(provider_id, AttemptOutcome::Success);
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| match &a.outcome {
                AttemptOutcome::Success => format!("{}: SUCCESS", a.provider_id),
                AttemptOutcome::Empty => format!("{}: EMPTY", a.provider_id),
                AttemptOutcome::Skipped(skip) => format!("{}: SKIPPED ({})", a.provider_id, skip),
                AttemptOutcome::Error { message, .. } => {
                    format!("{}: ERROR ({})", a.provider_id, message)
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Check if any provider succeeded.
    pub fn has_success(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| a.outcome == AttemptOutcome::Success)
    }

    /// True when some provider answered and none of them had the instrument.
    ///
    /// An empty answer counts: the provider was reachable and had nothing.
    pub fn answered_not_found(&self) -> bool {
        self.attempts.iter().any(|a| {
            matches!(
                a.outcome,
                AttemptOutcome::Empty
                    | AttemptOutcome::Error {
                        kind: FailureKind::NotFound,
                        ..
                    }
            )
        })
    }

    /// True when `provider_id` was actually called (not merely skipped).
    pub fn was_called(&self, provider_id: &str) -> bool {
        self.attempts
            .iter()
            .any(|a| a.provider_id == provider_id && !matches!(a.outcome, AttemptOutcome::Skipped(_)))
    }

    /// Get all skip reasons.
    pub fn skip_reasons(&self) -> Vec<(&ProviderId, &SkipReason)> {
        self.attempts
            .iter()
            .filter_map(|a| match &a.outcome {
                AttemptOutcome::Skipped(reason) => Some((&a.provider_id, reason)),
                _ => None,
            })
            .collect()
    }

    /// Get all errors.
    pub fn errors(&self) -> Vec<(&ProviderId, &str)> {
        self.attempts
            .iter()
            .filter_map(|a| match &a.outcome {
                AttemptOutcome::Error { message, .. } => Some((&a.provider_id, message.as_str())),
                _ => None,
            })
            .collect()
    }
}
