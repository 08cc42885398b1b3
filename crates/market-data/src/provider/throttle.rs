//! Client-side request pacing.
//!
//! A token bucket per provider keeps us under the upstream's documented
//! request rate, so the server-side limit (and the cooldown that follows) is
//! rarely hit in the first place.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    /// Tokens per second.
    rate: f64,
    capacity: f64,
}

impl TokenBucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill();
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.rate)
        }
    }
}

/// Token bucket for a single provider.
#[derive(Debug)]
pub struct RequestPacer {
    label: &'static str,
    bucket: Mutex<TokenBucket>,
}

impl RequestPacer {
    /// Allow `requests` per `per`, with bursts of up to `burst`.
    pub fn new(label: &'static str, requests: u32, per: Duration, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            label,
            bucket: Mutex::new(TokenBucket {
                tokens: capacity,
                last_update: Instant::now(),
                rate: f64::from(requests.max(1)) / per.as_secs_f64().max(f64::EPSILON),
                capacity,
            }),
        }
    }

    fn lock_bucket(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket.lock().unwrap_or_else(|poisoned| {
            warn!("Request pacer mutex for '{}' was poisoned, recovering", self.label);
            poisoned.into_inner()
        })
    }

    /// Wait until a request may be sent.
    pub async fn acquire(&self) {
        loop {
            let wait_time = {
                let mut bucket = self.lock_bucket();
                if bucket.try_acquire() {
                    return;
                }
                bucket.time_until_available()
            };

            if wait_time > Duration::ZERO {
                debug!("Request pacer: waiting {:?} for '{}'", wait_time, self.label);
                tokio::time::sleep(wait_time).await;
            }
        }
    }

    /// Take a token without waiting. Returns false when the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        self.lock_bucket().try_acquire()
    }
}
