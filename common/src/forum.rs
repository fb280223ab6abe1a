use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;

/// Unique forum thread identifier (server-assigned).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

/// A reply within a forum thread. Replies are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumReply {
    pub id: String,
    pub author: UserId,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A discussion forum thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumThread {
    pub id: ThreadId,
    pub author: UserId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<ForumReply>,
}
