use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationId, MessagePreview};
use crate::identity::UserId;
use crate::offer::{Offer, OfferId};
use crate::order::OrderId;

/// Server-assigned message identifier — the deduplication key for
/// reconciling optimistic copies with their push-delivered echoes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// What a message carries. Exactly one variant per message, so display
/// dispatch is a total match rather than marker-substring detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Text { text: String },
    Offer(Offer),
    VideoInvite { room_id: String },
    MeetingCancelled { room_id: String },
    /// Silent marker: the sender withdrew the referenced offer.
    OfferWithdrawn { offer_id: OfferId },
    /// Silent marker: the referenced offer was accepted and an order now
    /// exists. A cache-invalidation hint; the order record is canonical.
    OfferAccepted { offer_id: OfferId, order_id: OrderId },
    Attachment { file_name: String, url: String },
}

impl MessageBody {
    /// Markers exchanged purely to flip counterparty state; never displayed.
    pub fn is_silent_marker(&self) -> bool {
        matches!(
            self,
            MessageBody::OfferWithdrawn { .. } | MessageBody::OfferAccepted { .. }
        )
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: UserId,
    pub body: MessageBody,
    pub sent_at: DateTime<Utc>,
}

const PREVIEW_MAX: usize = 80;

fn truncate(s: &str) -> String {
    if s.chars().count() <= PREVIEW_MAX {
        s.to_string()
    } else {
        let cut: String = s.chars().take(PREVIEW_MAX).collect();
        format!("{cut}…")
    }
}

impl Message {
    /// Short text for the conversation-list preview, or None for silent
    /// markers (they must not disturb the preview).
    pub fn preview_text(&self) -> Option<String> {
        match &self.body {
            MessageBody::Text { text } => Some(truncate(text)),
            MessageBody::Offer(offer) => Some(truncate(&format!(
                "Offer: {} ({})",
                offer.terms.description, offer.terms.amount
            ))),
            MessageBody::VideoInvite { .. } => Some("Video call invitation".to_string()),
            MessageBody::MeetingCancelled { .. } => Some("Meeting cancelled".to_string()),
            MessageBody::Attachment { file_name, .. } => Some(format!("Attachment: {file_name}")),
            MessageBody::OfferWithdrawn { .. } | MessageBody::OfferAccepted { .. } => None,
        }
    }

    /// Preview record for the conversation list, or None for silent markers.
    pub fn as_preview(&self) -> Option<MessagePreview> {
        self.preview_text().map(|excerpt| MessagePreview {
            sender: self.sender.clone(),
            excerpt,
            sent_at: self.sent_at,
        })
    }
}
