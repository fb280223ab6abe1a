use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::offer::OfferId;
use crate::payment::Amount;

/// Unique order identifier (server-assigned).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// Backend-authoritative order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, developer has not started yet.
    Pending,
    /// Developer is working.
    InProgress,
    /// Developer marked the work delivered; awaiting the student.
    Delivered,
    /// Student accepted the delivery.
    Completed,
    /// Cancelled by either party before completion.
    Cancelled,
}

impl OrderStatus {
    /// Ordinal for deciding which of two racing status reports to keep.
    /// Higher always wins.
    pub fn ordinal(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::InProgress => 1,
            OrderStatus::Delivered => 2,
            OrderStatus::Cancelled => 2,
            OrderStatus::Completed => 3,
        }
    }

    /// Returns true if transitioning from self to `next` is valid.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::InProgress)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::InProgress, OrderStatus::Delivered)
                | (OrderStatus::InProgress, OrderStatus::Cancelled)
                | (OrderStatus::Delivered, OrderStatus::Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Star rating, 1 to 5. Construction and deserialization both validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(stars: u8) -> Option<Rating> {
        (1..=5).contains(&stars).then_some(Rating(stars))
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = String;

    fn try_from(stars: u8) -> Result<Self, Self::Error> {
        Rating::new(stars).ok_or_else(|| format!("rating out of range: {stars}"))
    }
}

/// Feedback one party leaves on a finished order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: Rating,
    pub comment: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The backend record created once an offer is accepted and payment
/// (or free-tier confirmation) completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub offer_id: OfferId,
    pub student: UserId,
    pub developer: UserId,
    pub description: String,
    pub amount: Amount,
    pub delivery_days: u32,
    pub revisions: u32,
    pub meeting_included: bool,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub student_feedback: Option<Feedback>,
    #[serde(default)]
    pub developer_feedback: Option<Feedback>,
}

impl Order {
    /// Merge a status report that may have raced another one; the higher
    /// ordinal wins, so stale reports never regress the displayed state.
    pub fn merge_status(&mut self, incoming: OrderStatus) {
        if incoming.ordinal() >= self.status.ordinal() {
            self.status = incoming;
        }
    }
}
