//! Conversation flow against the mock backend: optimistic send + push
//! echo, conversation switching, previews, deletion.

use devlink_client_integration::{await_push, TestBackend};
use devlink_common::identity::{Role, UserId};
use devlink_common::message::MessageBody;

async fn backend_with_pair() -> TestBackend {
    let backend = TestBackend::spawn().await;
    backend.seed_user("alice", Role::Student);
    backend.seed_user("dana", Role::Developer);
    backend
}

#[tokio::test]
async fn optimistic_send_then_push_echo_renders_once() {
    let backend = backend_with_pair().await;
    let mut alice = backend.sign_in("alice").await;

    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    alice.send_text("hello dana").await.unwrap();
    assert_eq!(alice.store().active_messages().len(), 1);

    // the push echo of our own message arrives and must deduplicate
    assert!(await_push(&mut alice).await);
    assert_eq!(alice.store().active_messages().len(), 1);
    assert_eq!(
        alice.store().active_messages()[0].body,
        MessageBody::Text {
            text: "hello dana".into()
        }
    );
}

#[tokio::test]
async fn counterparty_sees_message_without_refetch() {
    let backend = backend_with_pair().await;
    let mut alice = backend.sign_in("alice").await;
    let mut dana = backend.sign_in("dana").await;

    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    dana.open_conversation(&UserId::from("alice")).await.unwrap();

    alice.send_text("are you free this week?").await.unwrap();

    assert!(await_push(&mut dana).await);
    let messages = dana.store().active_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, UserId::from("alice"));
}

#[tokio::test]
async fn switching_conversations_keeps_only_the_new_history() {
    let backend = backend_with_pair().await;
    backend.seed_user("erik", Role::Developer);
    let mut alice = backend.sign_in("alice").await;

    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    alice.send_text("for dana").await.unwrap();

    alice.open_conversation(&UserId::from("erik")).await.unwrap();
    alice.send_text("for erik").await.unwrap();

    let messages = alice.store().active_messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].body,
        MessageBody::Text {
            text: "for erik".into()
        }
    );
    assert_eq!(alice.store().active_peer(), Some(&UserId::from("erik")));
}

#[tokio::test]
async fn preview_tracks_latest_message() {
    let backend = backend_with_pair().await;
    let mut alice = backend.sign_in("alice").await;

    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    alice.send_text("first").await.unwrap();
    alice.send_text("second").await.unwrap();

    alice.load_conversations().await.unwrap();
    let conversations = alice.store().conversations();
    assert_eq!(conversations.len(), 1);
    let preview = conversations[0].last_message.as_ref().unwrap();
    assert_eq!(preview.excerpt, "second");
}

#[tokio::test]
async fn deleting_active_conversation_clears_everything() {
    let backend = backend_with_pair().await;
    let mut alice = backend.sign_in("alice").await;

    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    alice.send_text("hello").await.unwrap();
    alice.load_conversations().await.unwrap();

    let conversation = alice.store().conversations()[0].id.clone();
    alice.delete_conversation(&conversation).await.unwrap();

    assert!(alice.store().conversations().is_empty());
    assert!(alice.store().active_messages().is_empty());
    assert!(alice.store().active_peer().is_none());
}

#[tokio::test]
async fn attachment_round_trips_as_file_reference() {
    let backend = backend_with_pair().await;
    let mut alice = backend.sign_in("alice").await;

    alice.open_conversation(&UserId::from("dana")).await.unwrap();
    alice
        .send_attachment("spec.pdf", b"%PDF-1.4 ...".to_vec())
        .await
        .unwrap();

    let messages = alice.store().active_messages();
    assert_eq!(messages.len(), 1);
    match &messages[0].body {
        MessageBody::Attachment { file_name, url } => {
            assert_eq!(file_name, "spec.pdf");
            assert!(url.contains("spec.pdf"));
        }
        other => panic!("expected attachment, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthenticated_calls_are_rejected() {
    let backend = backend_with_pair().await;
    let mut anonymous = backend.client();

    let err = anonymous
        .open_conversation(&UserId::from("dana"))
        .await
        .unwrap_err();
    assert!(matches!(err, devlink_client::error::ClientError::Auth));
}
