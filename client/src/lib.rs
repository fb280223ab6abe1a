//! devlink-client — client SDK for the devlink marketplace.
//!
//! Wires the conversation store, the offer lifecycle, the REST backend and
//! the push channel into the user-level flow: user action → optimistic
//! local mutation → network request → push echo → reconciliation → render.
//!
//! The client is single-logical-thread and event-driven: it owns all
//! mutable state, and asynchronous completions (fetch results, push
//! events) are funneled through it, so "concurrency" means interleaving,
//! never parallel mutation.

pub mod api;
pub mod checkout;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod realtime;
pub mod render;
pub mod session;
pub mod store;

use devlink_common::conversation::ConversationId;
use devlink_common::forum::{ForumThread, ThreadId};
use devlink_common::identity::{Role, UserId};
use devlink_common::message::{Message, MessageBody};
use devlink_common::offer::{Offer, OfferId, OfferTerms};
use devlink_common::order::{Order, OrderId, OrderStatus, Rating};
use devlink_common::profile::DeveloperProfile;
use devlink_common::subscription::SubscriptionStatus;

use crate::api::{ApiClient, VideoToken};
use crate::checkout::{CheckoutOutcome, CheckoutResume};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::lifecycle::OfferLifecycle;
use crate::realtime::{ChannelEvent, RealtimeClient};
use crate::render::{render_message, RenderedMessage};
use crate::session::{AuthSession, SessionStore};
use crate::store::ConversationStore;

/// The marketplace client. Generic over the durable session storage so
/// tests run against an in-memory store.
pub struct Client<S: SessionStore> {
    api: ApiClient,
    session: S,
    store: ConversationStore,
    lifecycle: OfferLifecycle,
    realtime: RealtimeClient,
    auth: Option<AuthSession>,
}

impl<S: SessionStore> Client<S> {
    /// Build a client, restoring any persisted sign-in.
    pub fn new(config: ClientConfig, session: S) -> Client<S> {
        let auth = session::load_auth(&session);
        let mut api = ApiClient::new(config.api_url.clone());
        if let Some(a) = &auth {
            api.set_token(Some(a.token.clone()));
        }
        Client {
            api,
            session,
            store: ConversationStore::new(),
            lifecycle: OfferLifecycle::new(),
            realtime: RealtimeClient::new(config.ws_url),
            auth,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn lifecycle(&self) -> &OfferLifecycle {
        &self.lifecycle
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn signed_in(&self) -> Option<&AuthSession> {
        self.auth.as_ref()
    }

    fn require_auth(&self) -> Result<&AuthSession> {
        self.auth.as_ref().ok_or(ClientError::Auth)
    }

    // ─── Auth ───────────────────────────────────────────────────────────

    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<()> {
        let response = self.api.login(identifier, password).await?;
        let auth = AuthSession {
            token: response.token,
            user_id: response.user.id.clone(),
            username: response.user.username.clone(),
            role: response.user.role,
        };
        session::save_auth(&mut self.session, &auth)?;
        self.api.set_token(Some(auth.token.clone()));
        self.auth = Some(auth);
        Ok(())
    }

    pub async fn signup(&self, username: &str, email: &str, password: &str, role: Role) -> Result<()> {
        self.api.signup(username, email, password, role).await
    }

    /// Finish signup with the emailed one-time code.
    pub async fn verify_otp(&mut self, email: &str, code: &str) -> Result<()> {
        let response = self.api.verify_otp(email, code).await?;
        let auth = AuthSession {
            token: response.token,
            user_id: response.user.id.clone(),
            username: response.user.username.clone(),
            role: response.user.role,
        };
        session::save_auth(&mut self.session, &auth)?;
        self.api.set_token(Some(auth.token.clone()));
        self.auth = Some(auth);
        Ok(())
    }

    /// Drop the signed-in state and all mirrored conversation state.
    pub fn logout(&mut self) -> Result<()> {
        session::clear_auth(&mut self.session)?;
        self.api.set_token(None);
        self.auth = None;
        self.store = ConversationStore::new();
        self.lifecycle = OfferLifecycle::new();
        self.realtime.unsubscribe();
        Ok(())
    }

    // ─── Conversations ──────────────────────────────────────────────────

    /// Refresh the conversation list. A fetch failure degrades to an
    /// empty list with an error state instead of propagating.
    pub async fn load_conversations(&mut self) -> Result<()> {
        let me = self.require_auth()?.user_id.clone();
        match self.api.conversations(&me).await {
            Ok(list) => self.store.set_conversations(list),
            Err(e) => {
                tracing::warn!("conversation list fetch failed: {e}");
                self.store.fail_conversations(e.to_string());
            }
        }
        Ok(())
    }

    /// Make `peer` the active conversation: acquire its push channel (or
    /// degrade to polling), then fetch history. A fetch that resolves
    /// after the user has moved on is discarded by the selection guard.
    pub async fn open_conversation(&mut self, peer: &UserId) -> Result<()> {
        let me = self.require_auth()?.user_id.clone();
        let token = self.store.select(peer.clone());

        if let Err(e) = self.realtime.subscribe_pair(&me, peer).await {
            tracing::warn!("push channel unavailable, polling only: {e}");
        }

        match self.api.message_history(&me, peer).await {
            Ok(messages) => {
                if self.store.commit_messages(token, messages) {
                    self.lifecycle = OfferLifecycle::replay(self.store.active_messages());
                }
            }
            Err(e) => {
                tracing::warn!("message history fetch failed: {e}");
                self.store.last_error = Some(e.to_string());
            }
        }
        Ok(())
    }

    /// Authoritative resync of the active conversation (the polling path).
    pub async fn refresh_messages(&mut self) -> Result<()> {
        let me = self.require_auth()?.user_id.clone();
        let Some(peer) = self.store.active_peer().cloned() else {
            return Ok(());
        };
        let Some(token) = self.store.current_selection() else {
            return Ok(());
        };
        let messages = self.api.message_history(&me, &peer).await?;
        if self.store.commit_messages(token, messages) {
            self.lifecycle = OfferLifecycle::replay(self.store.active_messages());
        }
        Ok(())
    }

    /// Fold any pending push events into the store. Cheap; call it from
    /// the UI tick.
    pub fn drain_push(&mut self) {
        while let Some(event) = self.realtime.try_recv() {
            match event {
                ChannelEvent::NewMessage(message) => {
                    self.lifecycle.observe(&message);
                    self.store.reconcile_incoming(message);
                }
                ChannelEvent::Disconnected => {
                    tracing::warn!("push channel dropped, polling only until reselected");
                }
            }
        }
    }

    /// Wait for one push event and fold it in. Returns false once the
    /// channel is gone.
    pub async fn next_push(&mut self) -> bool {
        match self.realtime.recv().await {
            Some(ChannelEvent::NewMessage(message)) => {
                self.lifecycle.observe(&message);
                self.store.reconcile_incoming(message);
                true
            }
            Some(ChannelEvent::Disconnected) | None => false,
        }
    }

    pub async fn delete_conversation(&mut self, conversation: &ConversationId) -> Result<()> {
        self.api.delete_conversation(conversation).await?;
        let was_active = self.store.active_conversation_id() == Some(conversation);
        self.store.delete_conversation(conversation);
        if was_active {
            self.realtime.unsubscribe();
        }
        Ok(())
    }

    // ─── Messages ───────────────────────────────────────────────────────

    /// Send a text message to the active peer. The confirmed record is
    /// appended optimistically; the push echo later deduplicates by id.
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(ClientError::validation("message", "must not be empty"));
        }
        let peer = self.active_peer_required()?;
        let body = MessageBody::Text {
            text: text.to_string(),
        };
        let message = self.api.send_message(&peer, &body).await?;
        self.absorb_own(message);
        Ok(())
    }

    pub async fn send_attachment(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<()> {
        if bytes.is_empty() {
            return Err(ClientError::validation("file", "must not be empty"));
        }
        let peer = self.active_peer_required()?;
        let message = self.api.send_attachment(&peer, file_name, bytes).await?;
        self.absorb_own(message);
        Ok(())
    }

    /// Propose work to the active peer.
    pub async fn send_offer(&mut self, terms: OfferTerms) -> Result<()> {
        if terms.description.trim().is_empty() {
            return Err(ClientError::validation("description", "must not be empty"));
        }
        if terms.delivery_days == 0 {
            return Err(ClientError::validation("delivery_days", "must be at least 1"));
        }
        let peer = self.active_peer_required()?;
        let message = self.api.send_offer(&peer, &terms).await?;
        self.absorb_own(message);
        Ok(())
    }

    pub async fn send_video_invite(&mut self, room_id: &str) -> Result<()> {
        let peer = self.active_peer_required()?;
        let body = MessageBody::VideoInvite {
            room_id: room_id.to_string(),
        };
        let message = self.api.send_message(&peer, &body).await?;
        self.absorb_own(message);
        Ok(())
    }

    pub async fn cancel_meeting(&mut self, room_id: &str) -> Result<()> {
        let peer = self.active_peer_required()?;
        let body = MessageBody::MeetingCancelled {
            room_id: room_id.to_string(),
        };
        let message = self.api.send_message(&peer, &body).await?;
        self.absorb_own(message);
        Ok(())
    }

    /// The active conversation as the signed-in user sees it.
    pub fn render_active(&self) -> Vec<RenderedMessage> {
        let Some(auth) = self.auth.as_ref() else {
            return Vec::new();
        };
        self.store
            .active_messages()
            .iter()
            .map(|m| render_message(m, &auth.user_id, &self.lifecycle))
            .collect()
    }

    fn active_peer_required(&self) -> Result<UserId> {
        self.require_auth()?;
        self.store
            .active_peer()
            .cloned()
            .ok_or(ClientError::NotFound("active conversation"))
    }

    fn absorb_own(&mut self, message: Message) {
        self.lifecycle.observe(&message);
        self.store.append_optimistic(message);
    }

    // ─── Offers & booking ───────────────────────────────────────────────

    fn find_offer(&self, offer_id: &OfferId) -> Option<Offer> {
        self.store.active_messages().iter().find_map(|m| match &m.body {
            MessageBody::Offer(offer) if &offer.id == offer_id => Some(offer.clone()),
            _ => None,
        })
    }

    /// Accept an open offer and start the booking.
    ///
    /// The acceptance is claimed synchronously before any network call, so
    /// a double-click sends exactly one order-creation request; the loser
    /// gets a validation error. On any downstream failure the claim is
    /// rolled back and the accept control re-enables.
    pub async fn accept_offer(&mut self, offer_id: &OfferId) -> Result<CheckoutOutcome> {
        let me = self.require_auth()?.user_id.clone();
        let offer = self
            .find_offer(offer_id)
            .ok_or(ClientError::NotFound("offer"))?;
        if offer.receiver != me {
            return Err(ClientError::validation("offer", "only the receiver can accept"));
        }
        if !self.lifecycle.begin_accept(offer_id) {
            return Err(ClientError::validation("offer", "offer is no longer open"));
        }

        let subscription = match self.api.subscription_status(&me).await {
            Ok(subscription) => subscription,
            Err(e) => {
                self.lifecycle.abort_accept(offer_id);
                return Err(e);
            }
        };

        match checkout::begin(&self.api, &mut self.session, &offer, subscription.tier).await {
            Ok(CheckoutOutcome::OrderCreated(order)) => {
                self.lifecycle.confirm_accept(offer_id, order.id.clone());
                self.broadcast_accepted(&offer, &order).await;
                Ok(CheckoutOutcome::OrderCreated(order))
            }
            Ok(redirect) => Ok(redirect),
            Err(e) => {
                self.lifecycle.abort_accept(offer_id);
                Err(e)
            }
        }
    }

    /// Success route after the payment redirect. Idempotent: revisiting
    /// with the same reference finds the existing order and creates
    /// nothing.
    pub async fn resume_checkout_success(&mut self, order_ref: &str) -> Result<Order> {
        self.require_auth()?;
        let resume: CheckoutResume =
            checkout::complete_success(&self.api, &mut self.session, order_ref).await?;
        self.lifecycle
            .confirm_accept(&resume.order.offer_id, resume.order.id.clone());
        if resume.newly_created {
            let offer = self.find_offer(&resume.order.offer_id);
            if let Some(offer) = offer {
                self.broadcast_accepted(&offer, &resume.order).await;
            } else {
                // conversation not open (fresh page after redirect): the
                // counterparty still learns the state from the order record
                self.send_accept_marker(&resume.order).await;
            }
        }
        Ok(resume.order)
    }

    /// Cancel route after the payment redirect: no order; the offer
    /// reopens so the user can retry.
    pub fn resume_checkout_cancel(&mut self, order_ref: &str) {
        if let Some(pending) = session::load_pending_checkout(&self.session) {
            if pending.order_ref == order_ref {
                self.lifecycle.abort_accept(&pending.offer_id);
            }
        }
        checkout::complete_cancel(order_ref);
    }

    /// Withdraw an offer I sent. Idempotent: withdrawing an already
    /// withdrawn offer does nothing.
    pub async fn withdraw_offer(&mut self, offer_id: &OfferId) -> Result<()> {
        let me = self.require_auth()?.user_id.clone();
        let offer = self
            .find_offer(offer_id)
            .ok_or(ClientError::NotFound("offer"))?;
        if offer.sender != me {
            return Err(ClientError::validation("offer", "only the sender can withdraw"));
        }
        if !self.lifecycle.apply_withdrawal(offer_id) {
            return Ok(());
        }
        let body = MessageBody::OfferWithdrawn {
            offer_id: offer_id.clone(),
        };
        let message = self.api.send_message(&offer.receiver, &body).await?;
        self.store.append_optimistic(message);
        Ok(())
    }

    /// Broadcast the silent acceptance marker so the counterparty's view
    /// updates without a reload. Best-effort: the order record is the
    /// canonical state, so a failed marker only delays the refresh.
    async fn broadcast_accepted(&mut self, offer: &Offer, order: &Order) {
        let body = MessageBody::OfferAccepted {
            offer_id: offer.id.clone(),
            order_id: order.id.clone(),
        };
        match self.api.send_message(&offer.sender, &body).await {
            Ok(message) => self.store.append_optimistic(message),
            Err(e) => tracing::warn!("acceptance marker not delivered: {e}"),
        }
    }

    async fn send_accept_marker(&mut self, order: &Order) {
        let me = match self.auth.as_ref() {
            Some(auth) => auth.user_id.clone(),
            None => return,
        };
        let counterparty = if order.student == me {
            order.developer.clone()
        } else {
            order.student.clone()
        };
        let body = MessageBody::OfferAccepted {
            offer_id: order.offer_id.clone(),
            order_id: order.id.clone(),
        };
        if let Err(e) = self.api.send_message(&counterparty, &body).await {
            tracing::warn!("acceptance marker not delivered: {e}");
        }
    }

    // ─── Orders ─────────────────────────────────────────────────────────

    pub async fn order(&self, id: &OrderId) -> Result<Order> {
        self.require_auth()?;
        self.api.order(id).await
    }

    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        let me = self.require_auth()?.user_id.clone();
        self.api.orders_for(&me).await
    }

    /// Developer action: mark the work delivered.
    pub async fn deliver_order(&self, id: &OrderId) -> Result<Order> {
        self.transition_order(id, OrderStatus::Delivered).await
    }

    /// Developer action: start working.
    pub async fn start_order(&self, id: &OrderId) -> Result<Order> {
        self.transition_order(id, OrderStatus::InProgress).await
    }

    /// Student action: accept the delivery.
    pub async fn complete_order(&self, id: &OrderId) -> Result<Order> {
        self.transition_order(id, OrderStatus::Completed).await
    }

    pub async fn cancel_order(&self, id: &OrderId) -> Result<Order> {
        self.transition_order(id, OrderStatus::Cancelled).await
    }

    async fn transition_order(&self, id: &OrderId, next: OrderStatus) -> Result<Order> {
        self.require_auth()?;
        let order = self.api.order(id).await?;
        if !order.status.can_transition_to(next) {
            return Err(ClientError::validation(
                "status",
                format!("cannot move order from {:?} to {next:?}", order.status),
            ));
        }
        self.api.update_order_status(id, next).await
    }

    pub async fn leave_feedback(
        &self,
        id: &OrderId,
        stars: u8,
        comment: &str,
        tags: Vec<String>,
    ) -> Result<Order> {
        self.require_auth()?;
        let rating = Rating::new(stars)
            .ok_or_else(|| ClientError::validation("rating", "must be between 1 and 5"))?;
        self.api.submit_feedback(id, rating, comment, &tags).await
    }

    // ─── Discovery, subscription, misc ──────────────────────────────────

    pub async fn developers(&self) -> Result<Vec<DeveloperProfile>> {
        self.api.developers().await
    }

    pub async fn subscription(&self) -> Result<SubscriptionStatus> {
        let me = self.require_auth()?.user_id.clone();
        self.api.subscription_status(&me).await
    }

    pub async fn submit_complaint(&self, subject: &str, body: &str) -> Result<()> {
        self.require_auth()?;
        if subject.trim().is_empty() {
            return Err(ClientError::validation("subject", "must not be empty"));
        }
        self.api.submit_complaint(subject, body).await
    }

    pub async fn forum_threads(&self) -> Result<Vec<ForumThread>> {
        self.api.forum_threads().await
    }

    pub async fn post_thread(&self, title: &str, body: &str) -> Result<ForumThread> {
        self.require_auth()?;
        if title.trim().is_empty() {
            return Err(ClientError::validation("title", "must not be empty"));
        }
        self.api.create_thread(title, body).await
    }

    pub async fn reply_to_thread(&self, thread: &ThreadId, body: &str) -> Result<ForumThread> {
        self.require_auth()?;
        self.api.reply_to_thread(thread, body).await
    }

    /// Short-lived server-issued room credential for the video SDK.
    pub async fn video_token(&self, room_id: &str) -> Result<VideoToken> {
        self.require_auth()?;
        self.api.video_token(room_id).await
    }

    pub fn dark_mode(&self) -> bool {
        session::dark_mode(&self.session)
    }

    pub fn set_dark_mode(&mut self, on: bool) -> Result<()> {
        session::set_dark_mode(&mut self.session, on)?;
        Ok(())
    }
}
