//! Typed client for the marketplace REST backend.
//!
//! Every authenticated call carries the bearer token; every failure maps
//! onto the client error taxonomy (401 → Auth, 404 → NotFound, 422 →
//! Validation, other non-2xx → Api, transport → Http).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use devlink_common::conversation::{Conversation, ConversationId};
use devlink_common::forum::{ForumThread, ThreadId};
use devlink_common::identity::{Role, UserId};
use devlink_common::message::{Message, MessageBody, MessageId};
use devlink_common::offer::{Offer, OfferId, OfferTerms};
use devlink_common::order::{Order, OrderId, OrderStatus, Rating};
use devlink_common::payment::{Amount, PendingCheckout};
use devlink_common::profile::{DeveloperProfile, UserProfile};
use devlink_common::subscription::SubscriptionStatus;

use crate::error::{ClientError, Result};

// ─── Request/response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
    role: Role,
}

#[derive(Debug, Serialize)]
struct VerifyOtpRequest<'a> {
    email: &'a str,
    code: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    recipient: &'a UserId,
    body: &'a MessageBody,
}

#[derive(Debug, Serialize)]
struct SendOfferRequest<'a> {
    receiver: &'a UserId,
    terms: &'a OfferTerms,
}

/// Order-creation payload; `order_ref` is the client-generated handle the
/// success route uses to detect an already-created order.
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub order_ref: String,
    pub offer_id: OfferId,
    pub conversation_id: ConversationId,
    pub student: UserId,
    pub developer: UserId,
    pub description: String,
    pub amount: Amount,
    pub delivery_days: u32,
    pub revisions: u32,
    pub meeting_included: bool,
}

impl From<&PendingCheckout> for CreateOrderRequest {
    fn from(pending: &PendingCheckout) -> CreateOrderRequest {
        CreateOrderRequest {
            order_ref: pending.order_ref.clone(),
            offer_id: pending.offer_id.clone(),
            conversation_id: pending.conversation_id.clone(),
            student: pending.student.clone(),
            developer: pending.developer.clone(),
            description: pending.description.clone(),
            amount: pending.amount,
            delivery_days: pending.delivery_days,
            revisions: pending.revisions,
            meeting_included: pending.meeting_included,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusUpdateRequest {
    status: OrderStatus,
}

#[derive(Debug, Serialize)]
struct FeedbackRequest<'a> {
    rating: Rating,
    comment: &'a str,
    tags: &'a [String],
}

#[derive(Debug, Serialize)]
struct CheckoutSessionRequest<'a> {
    order_ref: &'a str,
    amount: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub url: String,
}

#[derive(Debug, Serialize)]
struct ComplaintRequest<'a> {
    subject: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct NewThreadRequest<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct NewReplyRequest<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct VideoTokenRequest<'a> {
    room_id: &'a str,
}

/// Short-lived, server-issued room credential. The client never holds a
/// long-lived SDK secret.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

// ─── Client ─────────────────────────────────────────────────────────────────

pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: String) -> ApiClient {
        ApiClient {
            http: reqwest::Client::new(),
            base,
            token: None,
        }
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = self.dispatch(request).await?;
        Ok(response.json().await?)
    }

    /// For endpoints that reply with an empty body on success.
    async fn send_empty(&self, request: reqwest::RequestBuilder) -> Result<()> {
        self.dispatch(request).await.map(|_| ())
    }

    async fn dispatch(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => ClientError::Auth,
            404 => ClientError::NotFound("resource"),
            422 => ClientError::Validation {
                field: "request",
                reason: message,
            },
            code => ClientError::Api {
                status: code,
                message,
            },
        })
    }

    // ─── Auth ───────────────────────────────────────────────────────────

    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthResponse> {
        let body = LoginRequest { identifier, password };
        self.send(self.http.post(self.url("/auth/login")).json(&body)).await
    }

    pub async fn signup(&self, username: &str, email: &str, password: &str, role: Role) -> Result<()> {
        let body = SignupRequest { username, email, password, role };
        self.send_empty(self.http.post(self.url("/auth/signup")).json(&body)).await
    }

    /// Exchange the emailed one-time code for a session token.
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<AuthResponse> {
        let body = VerifyOtpRequest { email, code };
        self.send(self.http.post(self.url("/auth/verify")).json(&body)).await
    }

    // ─── Profiles & discovery ───────────────────────────────────────────

    pub async fn profile(&self, user: &UserId) -> Result<UserProfile> {
        self.send(self.http.get(self.url(&format!("/users/{user}")))).await
    }

    pub async fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile> {
        self.send(
            self.http
                .put(self.url(&format!("/users/{}", profile.id)))
                .json(profile),
        )
        .await
    }

    pub async fn developers(&self) -> Result<Vec<DeveloperProfile>> {
        self.send(self.http.get(self.url("/developers"))).await
    }

    pub async fn developer(&self, user: &UserId) -> Result<DeveloperProfile> {
        self.send(self.http.get(self.url(&format!("/developers/{user}")))).await
    }

    // ─── Conversations & messages ───────────────────────────────────────

    pub async fn conversations(&self, user: &UserId) -> Result<Vec<Conversation>> {
        self.send(self.http.get(self.url(&format!("/conversations/{user}")))).await
    }

    pub async fn delete_conversation(&self, conversation: &ConversationId) -> Result<()> {
        self.send_empty(
            self.http
                .delete(self.url(&format!("/conversations/{}", conversation.0))),
        )
        .await
    }

    /// Full message history for a pair. Individual records that fail to
    /// decode are salvaged or dropped, never propagated as errors — a
    /// malformed payload must not take down the whole history.
    pub async fn message_history(&self, user: &UserId, peer: &UserId) -> Result<Vec<Message>> {
        let raw: Vec<serde_json::Value> = self
            .send(self.http.get(self.url(&format!("/messages/{user}/{peer}"))))
            .await?;
        Ok(raw.into_iter().filter_map(decode_message).collect())
    }

    pub async fn send_message(&self, recipient: &UserId, body: &MessageBody) -> Result<Message> {
        let payload = SendMessageRequest { recipient, body };
        self.send(self.http.post(self.url("/messages")).json(&payload)).await
    }

    /// Multipart upload: the attachment bytes plus the recipient field.
    pub async fn send_attachment(
        &self,
        recipient: &UserId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Message> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("recipient", recipient.to_string())
            .part("file", part);
        self.send(self.http.post(self.url("/messages/attachment")).multipart(form))
            .await
    }

    /// Create an offer; the backend embeds it in a new chat message and
    /// returns that message.
    pub async fn send_offer(&self, receiver: &UserId, terms: &OfferTerms) -> Result<Message> {
        let payload = SendOfferRequest { receiver, terms };
        self.send(self.http.post(self.url("/offers")).json(&payload)).await
    }

    // ─── Orders ─────────────────────────────────────────────────────────

    pub async fn create_order(&self, order: &CreateOrderRequest) -> Result<Order> {
        self.send(self.http.post(self.url("/orders")).json(order)).await
    }

    pub async fn order(&self, id: &OrderId) -> Result<Order> {
        self.send(self.http.get(self.url(&format!("/orders/{}", id.0)))).await
    }

    pub async fn orders_for(&self, user: &UserId) -> Result<Vec<Order>> {
        self.send(self.http.get(self.url(&format!("/orders/of/{user}")))).await
    }

    /// Look an order up by its client-generated reference; None when no
    /// order has been created for it yet.
    pub async fn find_order_by_ref(&self, order_ref: &str) -> Result<Option<Order>> {
        match self
            .send(self.http.get(self.url(&format!("/orders/by-ref/{order_ref}"))))
            .await
        {
            Ok(order) => Ok(Some(order)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn update_order_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order> {
        let body = StatusUpdateRequest { status };
        self.send(
            self.http
                .post(self.url(&format!("/orders/{}/status", id.0)))
                .json(&body),
        )
        .await
    }

    pub async fn submit_feedback(
        &self,
        id: &OrderId,
        rating: Rating,
        comment: &str,
        tags: &[String],
    ) -> Result<Order> {
        let body = FeedbackRequest { rating, comment, tags };
        self.send(
            self.http
                .post(self.url(&format!("/orders/{}/feedback", id.0)))
                .json(&body),
        )
        .await
    }

    // ─── Subscription & payment ─────────────────────────────────────────

    pub async fn subscription_status(&self, user: &UserId) -> Result<SubscriptionStatus> {
        self.send(self.http.get(self.url(&format!("/subscriptions/{user}")))).await
    }

    pub async fn create_checkout_session(
        &self,
        order_ref: &str,
        amount: Amount,
    ) -> Result<CheckoutSession> {
        let body = CheckoutSessionRequest { order_ref, amount };
        self.send(self.http.post(self.url("/checkout/session")).json(&body)).await
    }

    // ─── Misc ───────────────────────────────────────────────────────────

    pub async fn submit_complaint(&self, subject: &str, body: &str) -> Result<()> {
        let payload = ComplaintRequest { subject, body };
        self.send_empty(self.http.post(self.url("/complaints")).json(&payload)).await
    }

    pub async fn forum_threads(&self) -> Result<Vec<ForumThread>> {
        self.send(self.http.get(self.url("/forum"))).await
    }

    pub async fn create_thread(&self, title: &str, body: &str) -> Result<ForumThread> {
        let payload = NewThreadRequest { title, body };
        self.send(self.http.post(self.url("/forum")).json(&payload)).await
    }

    pub async fn reply_to_thread(&self, thread: &ThreadId, body: &str) -> Result<ForumThread> {
        let payload = NewReplyRequest { body };
        self.send(
            self.http
                .post(self.url(&format!("/forum/{}/replies", thread.0)))
                .json(&payload),
        )
        .await
    }

    pub async fn video_token(&self, room_id: &str) -> Result<VideoToken> {
        let payload = VideoTokenRequest { room_id };
        self.send(self.http.post(self.url("/video/token")).json(&payload)).await
    }
}

// ─── Tolerant message decoding ──────────────────────────────────────────────

/// Envelope fields every message record carries, used to salvage a message
/// whose offer payload is malformed.
#[derive(Debug, Deserialize)]
struct MessageEnvelope {
    id: MessageId,
    conversation_id: ConversationId,
    sender: UserId,
    sent_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct OfferEnvelope {
    id: OfferId,
    conversation_id: ConversationId,
    sender: UserId,
    receiver: UserId,
}

/// Decode one raw message record. A malformed offer payload degrades to an
/// offer card with safe fallback terms (zero amount, generic description);
/// anything unsalvageable is logged and dropped.
pub fn decode_message(raw: serde_json::Value) -> Option<Message> {
    match serde_json::from_value::<Message>(raw.clone()) {
        Ok(message) => Some(message),
        Err(first_err) => {
            let salvaged = salvage_offer(&raw);
            if salvaged.is_none() {
                tracing::warn!("dropping undecodable message record: {first_err}");
            } else {
                tracing::warn!("malformed offer payload, using fallback terms: {first_err}");
            }
            salvaged
        }
    }
}

fn salvage_offer(raw: &serde_json::Value) -> Option<Message> {
    let body = raw.get("body")?;
    if body.get("type")?.as_str()? != "offer" {
        return None;
    }
    let envelope: MessageEnvelope = serde_json::from_value(raw.clone()).ok()?;
    let offer: OfferEnvelope = serde_json::from_value(body.clone()).ok()?;
    Some(Message {
        id: envelope.id,
        conversation_id: envelope.conversation_id,
        sender: envelope.sender,
        body: MessageBody::Offer(Offer {
            id: offer.id,
            conversation_id: offer.conversation_id,
            sender: offer.sender,
            receiver: offer.receiver,
            terms: OfferTerms::fallback(),
        }),
        sent_at: envelope.sent_at,
    })
}
