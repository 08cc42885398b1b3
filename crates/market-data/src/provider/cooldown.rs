//! Per-provider rate-limit cooldown.
//!
//! When a provider signals throttling it is taken out of rotation for a fixed
//! duration. The tracker has two states:
//!
//! - **Available**: no cooldown, or the cooldown instant has passed.
//! - **Cooling down**: `now < until`; the registry skips the provider.
//!
//! State is in-memory and resets on restart.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{info, warn};

/// Cooldown state for a single provider.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    until: Mutex<Option<DateTime<Utc>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the state, recovering from poison.
    ///
    /// A poisoned tracker can at worst report a stale cooldown, which expires
    /// on its own.
    fn lock_until(&self) -> MutexGuard<'_, Option<DateTime<Utc>>> {
        self.until.lock().unwrap_or_else(|poisoned| {
            warn!("Cooldown mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// True when the provider may be called now.
    pub fn is_available(&self) -> bool {
        self.is_available_at(Utc::now())
    }

    /// True when the provider may be called at `now`.
    ///
    /// An expired cooldown is cleared on the way out.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        let mut until = self.lock_until();
        match *until {
            Some(expiry) if now < expiry => false,
            Some(_) => {
                *until = None;
                true
            }
            None => true,
        }
    }

    /// Start (or restart) a cooldown of `duration` from now.
    pub fn mark_rate_limited(&self, duration: Duration) -> DateTime<Utc> {
        self.mark_rate_limited_at(Utc::now(), duration)
    }

    /// Start (or restart) a cooldown of `duration` from `now`.
    ///
    /// Returns the instant at which the provider becomes available again.
    pub fn mark_rate_limited_at(&self, now: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
        let span = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        let expiry = now.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC);
        *self.lock_until() = Some(expiry);
        expiry
    }

    /// The expiry instant while a cooldown is active at `now`.
    pub fn cooldown_expiry_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let until = *self.lock_until();
        until.filter(|expiry| now < *expiry)
    }

    pub fn cooldown_expiry(&self) -> Option<DateTime<Utc>> {
        self.cooldown_expiry_at(Utc::now())
    }

    /// Clear any cooldown. Idempotent.
    pub fn reset(&self) {
        let mut until = self.lock_until();
        if until.take().is_some() {
            info!("Cooldown cleared");
        }
    }
}
