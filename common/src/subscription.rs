use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier; Pro unlocks the booking discount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
}

impl SubscriptionTier {
    /// Percent knocked off every paid booking for this tier.
    pub fn discount_percent(self) -> u8 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Pro => 20,
        }
    }
}

/// The user's current subscription as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub tier: SubscriptionTier,
    #[serde(default)]
    pub renews_at: Option<DateTime<Utc>>,
}
