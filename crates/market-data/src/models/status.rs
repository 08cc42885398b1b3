use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operational view of one provider's cooldown state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub id: String,
    pub name: String,
    pub available: bool,
    pub rate_limited: bool,
    /// Set only while a cooldown is active.
    pub cooldown_expiry: Option<DateTime<Utc>>,
}
