//! Client-local tracking of offer lifecycle state.
//!
//! Offers live inside immutable chat messages; their state moves through
//! silent marker messages and local user actions. This controller is the
//! one place that state is tracked, so the render path never has to infer
//! it from message content. The backend order record stays canonical —
//! an acceptance marker is a cache-invalidation hint, nothing more.

use std::collections::HashMap;

use devlink_common::message::{Message, MessageBody};
use devlink_common::offer::{OfferId, OfferStatus};
use devlink_common::order::OrderId;

#[derive(Debug, Default)]
pub struct OfferLifecycle {
    states: HashMap<OfferId, OfferStatus>,
    orders: HashMap<OfferId, OrderId>,
}

impl OfferLifecycle {
    pub fn new() -> OfferLifecycle {
        OfferLifecycle::default()
    }

    /// Current state of an offer; offers not yet tracked are Open.
    pub fn status(&self, id: &OfferId) -> OfferStatus {
        self.states.get(id).copied().unwrap_or(OfferStatus::Open)
    }

    /// The order created for an accepted offer, once known.
    pub fn order_for(&self, id: &OfferId) -> Option<&OrderId> {
        self.orders.get(id)
    }

    /// Claim an offer for acceptance. Flips Open → Accepted synchronously,
    /// before any network round trip, and reports whether this call won:
    /// a racing second click finds the state already flipped and loses.
    pub fn begin_accept(&mut self, id: &OfferId) -> bool {
        if !self.status(id).can_transition_to(OfferStatus::Accepted) {
            return false;
        }
        self.states.insert(id.clone(), OfferStatus::Accepted);
        true
    }

    /// Roll back a claimed acceptance whose checkout failed, so the accept
    /// control re-enables. Does nothing once an order exists.
    pub fn abort_accept(&mut self, id: &OfferId) {
        if self.status(id) == OfferStatus::Accepted && !self.orders.contains_key(id) {
            self.states.insert(id.clone(), OfferStatus::Open);
        }
    }

    /// Record that an order now exists for this offer.
    pub fn confirm_accept(&mut self, id: &OfferId, order: OrderId) {
        self.states.insert(id.clone(), OfferStatus::Accepted);
        self.orders.insert(id.clone(), order);
    }

    /// Apply a withdrawal marker. Idempotent: the second delivery of the
    /// same marker reports false and changes nothing; a marker for an
    /// already-accepted offer loses.
    pub fn apply_withdrawal(&mut self, id: &OfferId) -> bool {
        if !self.status(id).can_transition_to(OfferStatus::Withdrawn) {
            return false;
        }
        self.states.insert(id.clone(), OfferStatus::Withdrawn);
        true
    }

    /// Fold one message (from a history replay or a live push) into the
    /// tracked state.
    pub fn observe(&mut self, message: &Message) {
        match &message.body {
            MessageBody::Offer(offer) => {
                self.states.entry(offer.id.clone()).or_insert(OfferStatus::Open);
            }
            MessageBody::OfferWithdrawn { offer_id } => {
                self.apply_withdrawal(offer_id);
            }
            MessageBody::OfferAccepted { offer_id, order_id } => {
                self.confirm_accept(offer_id, order_id.clone());
            }
            _ => {}
        }
    }

    /// Rebuild from a full history fetch — the authoritative resync.
    pub fn replay<'a>(messages: impl IntoIterator<Item = &'a Message>) -> OfferLifecycle {
        let mut lifecycle = OfferLifecycle::new();
        for message in messages {
            lifecycle.observe(message);
        }
        lifecycle
    }
}
