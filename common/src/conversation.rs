use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// Unique conversation identifier (server-assigned).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Fixed prefix for per-pair pub/sub channels.
const CHANNEL_PREFIX: &str = "private-conversation";

/// Canonical pub/sub channel name for a participant pair.
///
/// The pair is sorted before joining so both participants derive the
/// identical name independently, without a negotiation step.
pub fn channel_name(a: &UserId, b: &UserId) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{CHANNEL_PREFIX}-{lo}-{hi}")
}

/// Cached copy of the newest message, shown in the conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePreview {
    pub sender: UserId,
    pub excerpt: String,
    pub sent_at: DateTime<Utc>,
}

/// A two-party conversation as listed in the inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: [UserId; 2],
    #[serde(default)]
    pub last_message: Option<MessagePreview>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn involves(&self, user: &UserId) -> bool {
        self.participants.iter().any(|p| p == user)
    }

    /// The participant that is not `me`, if `me` is part of this conversation.
    pub fn peer_of(&self, me: &UserId) -> Option<&UserId> {
        match &self.participants {
            [a, b] if a == me => Some(b),
            [a, b] if b == me => Some(a),
            _ => None,
        }
    }
}
