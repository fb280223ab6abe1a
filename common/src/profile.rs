use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{Role, UserId};
use crate::payment::Amount;

/// Public account data for any marketplace user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A developer as shown in the discovery listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperProfile {
    pub user: UserProfile,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub hourly_rate: Option<Amount>,
    /// Average star rating across finished orders, if any yet.
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub completed_orders: u32,
    pub joined_at: DateTime<Utc>,
}
