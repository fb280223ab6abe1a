//! Payment handoff against the mock backend: free-tier bypass, subscriber
//! discount, idempotent success route, cancel route.

use devlink_client::checkout::CheckoutOutcome;
use devlink_client_integration::TestBackend;
use devlink_common::identity::{Role, UserId};
use devlink_common::message::MessageBody;
use devlink_common::offer::{OfferId, OfferTerms};
use devlink_common::payment::Amount;

fn paid_terms(amount: &str) -> OfferTerms {
    OfferTerms {
        description: "Build a portfolio site".into(),
        amount: amount.parse().unwrap(),
        delivery_days: 5,
        revisions: 2,
        meeting_included: true,
    }
}

async fn backend_with_offer(terms: OfferTerms) -> (TestBackend, OfferId) {
    let backend = TestBackend::spawn().await;
    backend.seed_user("alice", Role::Student);
    backend.seed_user("dana", Role::Developer);

    let mut dana = backend.sign_in("dana").await;
    dana.open_conversation(&UserId::from("alice")).await.unwrap();
    dana.send_offer(terms).await.unwrap();

    let offer_id = match &dana.store().active_messages()[0].body {
        MessageBody::Offer(offer) => offer.id.clone(),
        other => panic!("expected offer message, got {other:?}"),
    };
    (backend, offer_id)
}

#[tokio::test]
async fn free_offer_creates_order_directly_without_redirect() {
    let mut terms = paid_terms("100.00");
    terms.amount = Amount::ZERO;
    let (backend, offer_id) = backend_with_offer(terms).await;

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();

    match alice.accept_offer(&offer_id).await.unwrap() {
        CheckoutOutcome::OrderCreated(order) => {
            assert_eq!(order.amount.to_string(), "0.00");
            assert_eq!(order.student, UserId::from("alice"));
            assert_eq!(order.developer, UserId::from("dana"));
        }
        CheckoutOutcome::RedirectTo { url, .. } => {
            panic!("free booking must not redirect (got {url})")
        }
    }
    // the payment provider was never involved
    assert!(backend.checkout_sessions().is_empty());
    assert_eq!(backend.order_count(), 1);
}

#[tokio::test]
async fn pro_subscriber_pays_discounted_amount() {
    let (backend, offer_id) = backend_with_offer(paid_terms("100.00")).await;
    backend.seed_pro("alice");

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();

    let (url, order_ref) = match alice.accept_offer(&offer_id).await.unwrap() {
        CheckoutOutcome::RedirectTo { url, order_ref } => (url, order_ref),
        CheckoutOutcome::OrderCreated(order) => {
            panic!("paid booking must redirect (got order {})", order.id.0)
        }
    };
    assert!(url.contains(&order_ref));

    // "100.00" at the 20% Pro discount → "80.00"
    assert_eq!(
        backend.checkout_sessions(),
        vec![(order_ref, "80.00".to_string())]
    );
    // no order until the success route runs
    assert_eq!(backend.order_count(), 0);
}

#[tokio::test]
async fn free_tier_subscriber_pays_full_amount() {
    let (backend, offer_id) = backend_with_offer(paid_terms("100.00")).await;

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    alice.accept_offer(&offer_id).await.unwrap();

    let sessions = backend.checkout_sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].1, "100.00");
}

#[tokio::test]
async fn success_route_twice_creates_exactly_one_order() {
    let (backend, offer_id) = backend_with_offer(paid_terms("60.00")).await;

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();

    let order_ref = match alice.accept_offer(&offer_id).await.unwrap() {
        CheckoutOutcome::RedirectTo { order_ref, .. } => order_ref,
        other => panic!("expected redirect, got {other:?}"),
    };

    let first = alice.resume_checkout_success(&order_ref).await.unwrap();
    // the user reloads the success page
    let second = alice.resume_checkout_success(&order_ref).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(backend.order_count(), 1);
}

#[tokio::test]
async fn cancel_route_creates_nothing_and_reopens_the_offer() {
    let (backend, offer_id) = backend_with_offer(paid_terms("60.00")).await;

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();

    let order_ref = match alice.accept_offer(&offer_id).await.unwrap() {
        CheckoutOutcome::RedirectTo { order_ref, .. } => order_ref,
        other => panic!("expected redirect, got {other:?}"),
    };

    alice.resume_checkout_cancel(&order_ref);
    assert_eq!(backend.order_count(), 0);

    // the offer reopened, so the booking can be retried
    match alice.accept_offer(&offer_id).await.unwrap() {
        CheckoutOutcome::RedirectTo { .. } => {}
        other => panic!("expected a fresh redirect, got {other:?}"),
    }
}
