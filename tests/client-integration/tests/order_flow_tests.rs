//! Order lifecycle and the surrounding platform surface: status
//! transitions, feedback, discovery, forum, complaints, video tokens.

use devlink_client::checkout::CheckoutOutcome;
use devlink_client::error::ClientError;
use devlink_client_integration::TestBackend;
use devlink_common::identity::{Role, UserId};
use devlink_common::message::MessageBody;
use devlink_common::offer::OfferTerms;
use devlink_common::order::{Order, OrderStatus};
use devlink_common::payment::Amount;

async fn backend_with_order() -> (TestBackend, Order) {
    let backend = TestBackend::spawn().await;
    backend.seed_user("alice", Role::Student);
    backend.seed_user("dana", Role::Developer);

    let mut dana = backend.sign_in("dana").await;
    dana.open_conversation(&UserId::from("alice")).await.unwrap();
    dana.send_offer(OfferTerms {
        description: "Code review session".into(),
        amount: Amount::ZERO,
        delivery_days: 1,
        revisions: 0,
        meeting_included: false,
    })
    .await
    .unwrap();
    let offer_id = match &dana.store().active_messages()[0].body {
        MessageBody::Offer(offer) => offer.id.clone(),
        other => panic!("expected offer, got {other:?}"),
    };

    let mut alice = backend.sign_in("alice").await;
    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    let order = match alice.accept_offer(&offer_id).await.unwrap() {
        CheckoutOutcome::OrderCreated(order) => order,
        other => panic!("expected order, got {other:?}"),
    };
    (backend, order)
}

#[tokio::test]
async fn order_walks_through_its_lifecycle() {
    let (backend, order) = backend_with_order().await;
    assert_eq!(order.status, OrderStatus::Pending);

    let dana = backend.sign_in("dana").await;
    let alice = backend.sign_in("alice").await;

    let started = dana.start_order(&order.id).await.unwrap();
    assert_eq!(started.status, OrderStatus::InProgress);

    let delivered = dana.deliver_order(&order.id).await.unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);

    let completed = alice.complete_order(&order.id).await.unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
}

#[tokio::test]
async fn invalid_transition_is_rejected_before_the_network_call() {
    let (backend, order) = backend_with_order().await;
    let alice = backend.sign_in("alice").await;

    // completing a Pending order skips Delivered entirely
    let err = alice.complete_order(&order.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));

    let unchanged = alice.order(&order.id).await.unwrap();
    assert_eq!(unchanged.status, OrderStatus::Pending);
}

#[tokio::test]
async fn both_parties_can_leave_feedback() {
    let (backend, order) = backend_with_order().await;
    let dana = backend.sign_in("dana").await;
    let alice = backend.sign_in("alice").await;

    dana.start_order(&order.id).await.unwrap();
    dana.deliver_order(&order.id).await.unwrap();
    alice.complete_order(&order.id).await.unwrap();

    let after_student = alice
        .leave_feedback(&order.id, 5, "fast and thorough", vec!["communication".into()])
        .await
        .unwrap();
    assert_eq!(after_student.student_feedback.unwrap().rating.stars(), 5);

    let after_developer = dana
        .leave_feedback(&order.id, 4, "clear brief", vec![])
        .await
        .unwrap();
    assert_eq!(after_developer.developer_feedback.unwrap().rating.stars(), 4);
}

#[tokio::test]
async fn out_of_range_rating_never_reaches_the_backend() {
    let (backend, order) = backend_with_order().await;
    let alice = backend.sign_in("alice").await;

    let err = alice
        .leave_feedback(&order.id, 0, "", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));
}

#[tokio::test]
async fn developer_discovery_lists_seeded_developers() {
    let backend = TestBackend::spawn().await;
    backend.seed_user("alice", Role::Student);
    backend.seed_user("dana", Role::Developer);
    backend.seed_user("erik", Role::Developer);

    let alice = backend.sign_in("alice").await;
    let developers = alice.developers().await.unwrap();
    assert_eq!(developers.len(), 2);
}

#[tokio::test]
async fn forum_thread_and_reply_round_trip() {
    let backend = TestBackend::spawn().await;
    backend.seed_user("alice", Role::Student);
    backend.seed_user("dana", Role::Developer);

    let alice = backend.sign_in("alice").await;
    let thread = alice
        .post_thread("How do I scope a fixed-price offer?", "Context inside.")
        .await
        .unwrap();

    let dana = backend.sign_in("dana").await;
    let updated = dana
        .reply_to_thread(&thread.id, "Start from deliverables, not hours.")
        .await
        .unwrap();
    assert_eq!(updated.replies.len(), 1);

    let listed = alice.forum_threads().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].replies.len(), 1);
}

#[tokio::test]
async fn complaint_requires_a_subject() {
    let backend = TestBackend::spawn().await;
    backend.seed_user("alice", Role::Student);
    let alice = backend.sign_in("alice").await;

    let err = alice.submit_complaint("  ", "body").await.unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));

    alice
        .submit_complaint("Late delivery", "Order o1 is overdue.")
        .await
        .unwrap();
}

#[tokio::test]
async fn video_token_is_short_lived_and_server_issued() {
    let backend = TestBackend::spawn().await;
    backend.seed_user("alice", Role::Student);
    let alice = backend.sign_in("alice").await;

    let token = alice.video_token("room-7").await.unwrap();
    assert!(token.token.contains("room-7"));
    assert!(token.expires_at > chrono::Utc::now());
}
