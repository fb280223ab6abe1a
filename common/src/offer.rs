use serde::{Deserialize, Serialize};

use crate::conversation::ConversationId;
use crate::identity::UserId;
use crate::payment::Amount;

/// Unique offer identifier (server-assigned).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

fn default_delivery_days() -> u32 {
    1
}

/// Negotiated terms of a priced proposal for work.
///
/// Optional fields default so a partial payload still deserializes:
/// zero revisions, no meeting, one-day delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferTerms {
    pub description: String,
    pub amount: Amount,
    #[serde(default = "default_delivery_days")]
    pub delivery_days: u32,
    #[serde(default)]
    pub revisions: u32,
    #[serde(default)]
    pub meeting_included: bool,
}

impl OfferTerms {
    /// Safe replacement for an offer payload that failed to deserialize:
    /// a generic description at zero price, so the render path never throws.
    pub fn fallback() -> OfferTerms {
        OfferTerms {
            description: "Custom development work".to_string(),
            amount: Amount::ZERO,
            delivery_days: 1,
            revisions: 0,
            meeting_included: false,
        }
    }
}

/// A priced proposal for work, embedded in a chat message.
///
/// The record itself is immutable once sent; lifecycle state is tracked
/// separately (see `OfferStatus`) and driven by silent marker messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub conversation_id: ConversationId,
    pub sender: UserId,
    pub receiver: UserId,
    pub terms: OfferTerms,
}

/// Client-visible lifecycle of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Open,
    Accepted,
    Withdrawn,
}

impl OfferStatus {
    /// Returns true if transitioning from self to `next` is valid.
    /// Accepted and Withdrawn are terminal.
    pub fn can_transition_to(self, next: OfferStatus) -> bool {
        matches!(
            (self, next),
            (OfferStatus::Open, OfferStatus::Accepted) | (OfferStatus::Open, OfferStatus::Withdrawn)
        )
    }

    pub fn is_open(self) -> bool {
        self == OfferStatus::Open
    }
}
