//! Offer lifecycle against the mock backend: acceptance (single and
//! raced), withdrawal idempotency, renderer gating, malformed payloads.

use devlink_client::error::ClientError;
use devlink_client::render::RenderedMessage;
use devlink_client_integration::{await_push, TestBackend};
use devlink_common::identity::{Role, UserId};
use devlink_common::message::MessageBody;
use devlink_common::offer::{OfferId, OfferStatus, OfferTerms};
use devlink_common::payment::Amount;
use serde_json::json;

fn free_terms() -> OfferTerms {
    OfferTerms {
        description: "Fix a flaky test".into(),
        amount: Amount::ZERO,
        delivery_days: 1,
        revisions: 0,
        meeting_included: false,
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
async fn receiver_sees_accept_control_sender_does_not() {
    let (backend, _) = backend_with_offer(free_terms()).await;

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    match &alice.render_active()[0] {
        RenderedMessage::OfferCard { can_accept, status, .. } => {
            assert_eq!(*status, OfferStatus::Open);
            assert!(can_accept);
        }
        other => panic!("expected offer card, got {other:?}"),
    }

    let mut dana = backend.sign_in("dana").await;
    dana.open_conversation(&UserId::from("alice")).await.unwrap();
    match &dana.render_active()[0] {
        RenderedMessage::OfferCard { can_accept, .. } => assert!(!can_accept),
        other => panic!("expected offer card, got {other:?}"),
    }
}

#[tokio::test]
async fn double_accept_sends_exactly_one_order_request() {
    let (backend, offer_id) = backend_with_offer(free_terms()).await;
    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();

    alice.accept_offer(&offer_id).await.unwrap();
    // the double-click: rejected client-side, no second request
    let err = alice.accept_offer(&offer_id).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));
    assert_eq!(backend.order_count(), 1);
}

#[tokio::test]
async fn sender_cannot_accept_own_offer() {
    let (backend, offer_id) = backend_with_offer(free_terms()).await;
    let mut dana = backend.sign_in("dana").await;
    dana.open_conversation(&UserId::from("alice")).await.unwrap();

    let err = dana.accept_offer(&offer_id).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));
    assert_eq!(backend.order_count(), 0);
}

#[tokio::test]
async fn withdrawal_is_broadcast_once_and_idempotent() {
    let (backend, offer_id) = backend_with_offer(free_terms()).await;

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();

    let mut dana = backend.sign_in("dana").await;
    dana.open_conversation(&UserId::from("alice")).await.unwrap();
    dana.withdraw_offer(&offer_id).await.unwrap();
    // second withdrawal is a no-op, not an error, and sends nothing
    dana.withdraw_offer(&offer_id).await.unwrap();

    let withdrawals = backend.count_messages(|m| {
        matches!(&m.body, MessageBody::OfferWithdrawn { offer_id: id } if *id == offer_id)
    });
    assert_eq!(withdrawals, 1);

    // the marker reaches alice and flips her view exactly once
    assert!(await_push(&mut alice).await);
    assert_eq!(alice.lifecycle().status(&offer_id), OfferStatus::Withdrawn);

    // a replayed duplicate marker changes nothing
    backend.shared.store_message(
        &UserId::from("dana"),
        &UserId::from("alice"),
        MessageBody::OfferWithdrawn {
            offer_id: offer_id.clone(),
        },
    );
    assert!(await_push(&mut alice).await);
    assert_eq!(alice.lifecycle().status(&offer_id), OfferStatus::Withdrawn);

    // and the offer can no longer be accepted
    let err = alice.accept_offer(&offer_id).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));
    assert_eq!(backend.order_count(), 0);
}

#[tokio::test]
async fn acceptance_marker_updates_counterparty_without_reload() {
    let (backend, offer_id) = backend_with_offer(free_terms()).await;

    let mut dana = backend.sign_in("dana").await;
    dana.open_conversation(&UserId::from("alice")).await.unwrap();

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    alice.accept_offer(&offer_id).await.unwrap();

    // dana's client hears the silent marker and flips the offer state
    // (the offer push echo may arrive first; drain until the marker lands)
    for _ in 0..3 {
        if dana.lifecycle().status(&offer_id) == OfferStatus::Accepted {
            break;
        }
        assert!(await_push(&mut dana).await);
    }
    assert_eq!(dana.lifecycle().status(&offer_id), OfferStatus::Accepted);
    assert!(dana.lifecycle().order_for(&offer_id).is_some());
}

#[tokio::test]
async fn malformed_offer_payload_degrades_to_fallback_terms() {
    let backend = TestBackend::spawn().await;
    backend.seed_user("alice", Role::Student);
    backend.seed_user("dana", Role::Developer);
    backend.inject_raw_message(
        "alice",
        "dana",
        json!({
            "id": "m-bad",
            "conversation_id": "c-bad",
            "sender": "dana",
            "body": {
                "type": "offer",
                "id": "of-bad",
                "conversation_id": "c-bad",
                "sender": "dana",
                "receiver": "alice",
                "terms": {"amount": {"currency": "bananas"}},
            },
            "sent_at": "2026-08-01T09:00:00Z",
        }),
    );

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();

    match &alice.render_active()[0] {
        RenderedMessage::OfferCard { offer, can_accept, .. } => {
            assert!(offer.terms.amount.is_zero());
            assert_eq!(offer.terms.description, OfferTerms::fallback().description);
            assert!(can_accept);
        }
        other => panic!("expected salvaged offer card, got {other:?}"),
    }
}
