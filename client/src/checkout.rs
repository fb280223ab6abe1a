//! Payment handoff: from "offer accepted" to "payment completed" or
//! "payment cancelled".
//!
//! A paid booking survives the full-page redirect to the payment provider
//! by persisting the order parameters to durable storage first; the
//! success route reads them back, creates the order, and clears them. The
//! success handler is idempotent: it looks the order up before creating
//! one, so revisiting the route cannot create a duplicate.

use chrono::Utc;

use devlink_common::offer::Offer;
use devlink_common::order::Order;
use devlink_common::payment::{Amount, PendingCheckout};
use devlink_common::subscription::SubscriptionTier;

use crate::api::{ApiClient, CreateOrderRequest};
use crate::error::{ClientError, Result};
use crate::session::{self, SessionStore};

/// Outcome of starting a booking.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// Free-tier booking: the order already exists; no redirect happened.
    OrderCreated(Order),
    /// Paid booking: send the page to the provider at this URL.
    RedirectTo { url: String, order_ref: String },
}

/// Result of the success route.
#[derive(Debug, Clone)]
pub struct CheckoutResume {
    pub order: Order,
    /// False when the order already existed (revisited success route).
    pub newly_created: bool,
}

fn new_order_ref() -> String {
    format!("{:016x}", rand::random::<u64>())
}

fn pending_for(offer: &Offer, amount: Amount) -> PendingCheckout {
    PendingCheckout {
        order_ref: new_order_ref(),
        offer_id: offer.id.clone(),
        conversation_id: offer.conversation_id.clone(),
        // the developer proposes, the student books
        student: offer.receiver.clone(),
        developer: offer.sender.clone(),
        description: offer.terms.description.clone(),
        amount,
        delivery_days: offer.terms.delivery_days,
        revisions: offer.terms.revisions,
        meeting_included: offer.terms.meeting_included,
        created_at: Utc::now(),
    }
}

/// Start a booking for an accepted offer.
///
/// Free offers create the order directly, bypassing the payment provider
/// entirely. Paid offers get the subscriber discount applied, persist the
/// pending parameters, and hand back the provider redirect URL.
pub async fn begin(
    api: &ApiClient,
    store: &mut impl SessionStore,
    offer: &Offer,
    tier: SubscriptionTier,
) -> Result<CheckoutOutcome> {
    if offer.terms.amount.is_zero() {
        let pending = pending_for(offer, Amount::ZERO);
        let order = api.create_order(&CreateOrderRequest::from(&pending)).await?;
        tracing::debug!(order = %order.id.0, "free-tier order created");
        return Ok(CheckoutOutcome::OrderCreated(order));
    }

    let amount = offer.terms.amount.apply_discount_percent(tier.discount_percent());
    let pending = pending_for(offer, amount);
    session::save_pending_checkout(store, &pending)?;
    let session = api.create_checkout_session(&pending.order_ref, amount).await?;
    Ok(CheckoutOutcome::RedirectTo {
        url: session.url,
        order_ref: pending.order_ref,
    })
}

/// Success route: create the order from the persisted parameters, unless
/// one already exists for this reference.
pub async fn complete_success(
    api: &ApiClient,
    store: &mut impl SessionStore,
    order_ref: &str,
) -> Result<CheckoutResume> {
    if let Some(order) = api.find_order_by_ref(order_ref).await? {
        tracing::debug!(%order_ref, "order already exists, skipping creation");
        session::clear_pending_checkout(store)?;
        return Ok(CheckoutResume {
            order,
            newly_created: false,
        });
    }

    let pending = session::load_pending_checkout(store)
        .filter(|p| p.order_ref == order_ref)
        .ok_or(ClientError::NotFound("pending checkout"))?;
    let order = api.create_order(&CreateOrderRequest::from(&pending)).await?;
    session::clear_pending_checkout(store)?;
    Ok(CheckoutResume {
        order,
        newly_created: true,
    })
}

/// Cancel route: no order is created; the persisted parameters stay
/// around only as discardable leftovers.
pub fn complete_cancel(order_ref: &str) {
    tracing::debug!(%order_ref, "checkout cancelled, no order created");
}
