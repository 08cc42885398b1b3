/// Classification of an absorbed provider failure.
///
/// | Kind | Registry behavior | Cooldown? |
/// |------|-------------------|-----------|
/// | `NotFound` | Try next provider, counts as an authoritative "no such symbol" | No |
/// | `Transient` | Try next provider | No |
/// | `RateLimited` | Try next provider | Yes, the provider's default duration |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureKind {
    /// The provider answered but does not know the instrument.
    NotFound,

    /// Timeout, 5xx, malformed payload, or anything else worth falling back on.
    Transient,

    /// The provider signalled that we are calling it too often.
    RateLimited,
}

impl FailureKind {
    /// Classify a free-text error message.
    pub fn from_message(message: &str) -> Self {
        if looks_rate_limited(message) {
            FailureKind::RateLimited
        } else {
            FailureKind::Transient
        }
    }
}

/// Markers that indicate throttling when no status code is available.
///
/// Matched case-insensitively. A bare "rate" is deliberately absent: it also
/// matches words like "generate" or "accurate". The status code only counts
/// when it reads as one, so a price like "1429.5" is not a marker.
const RATE_LIMIT_MARKERS: &[&str] = &[
    "http 429",
    "status 429",
    "status: 429",
    "code 429",
    "too many requests",
    "rate limit",
    "rate-limit",
    "ratelimit",
    "api call frequency",
];

/// Returns true when an error message carries a rate-limit marker.
pub fn looks_rate_limited(message: &str) -> bool {
    let lowered = message.to_lowercase();
    RATE_LIMIT_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}
