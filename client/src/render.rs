//! Pure mapping from a message to displayable content. Display-only:
//! rendering never mutates the conversation store or the lifecycle.

use devlink_common::identity::UserId;
use devlink_common::message::{Message, MessageBody};
use devlink_common::offer::{Offer, OfferId, OfferStatus};

use crate::lifecycle::OfferLifecycle;

/// What a message paints as.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedMessage {
    CancellationNotice { room_id: String },
    WithdrawalNotice { offer_id: OfferId },
    VideoInvite { room_id: String },
    OfferCard {
        offer: Offer,
        status: OfferStatus,
        /// Whether to show the accept control: only for the receiver, only
        /// while the offer is still open.
        can_accept: bool,
    },
    Attachment { file_name: String, url: String },
    PlainText { text: String },
    /// Silent markers paint nothing.
    Hidden,
}

/// Render a message as seen by `viewer`.
///
/// Dispatch precedence is fixed — cancellation > withdrawal > video invite
/// > offer > attachment > plain text — and the tagged body guarantees
/// exactly one arm matches any message. Pure: rendering the same message
/// twice yields identical output.
pub fn render_message(
    message: &Message,
    viewer: &UserId,
    lifecycle: &OfferLifecycle,
) -> RenderedMessage {
    match &message.body {
        MessageBody::MeetingCancelled { room_id } => RenderedMessage::CancellationNotice {
            room_id: room_id.clone(),
        },
        MessageBody::OfferWithdrawn { offer_id } => RenderedMessage::WithdrawalNotice {
            offer_id: offer_id.clone(),
        },
        MessageBody::VideoInvite { room_id } => RenderedMessage::VideoInvite {
            room_id: room_id.clone(),
        },
        MessageBody::Offer(offer) => {
            let status = lifecycle.status(&offer.id);
            RenderedMessage::OfferCard {
                offer: offer.clone(),
                status,
                can_accept: status.is_open() && viewer == &offer.receiver,
            }
        }
        MessageBody::Attachment { file_name, url } => RenderedMessage::Attachment {
            file_name: file_name.clone(),
            url: url.clone(),
        },
        MessageBody::Text { text } => RenderedMessage::PlainText { text: text.clone() },
        MessageBody::OfferAccepted { .. } => RenderedMessage::Hidden,
    }
}
