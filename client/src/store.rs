//! Single source of truth for the conversation list and the active
//! conversation's messages.
//!
//! Every mutation path — optimistic append, push reconciliation, list
//! refresh, deletion — is idempotent with respect to message identifiers,
//! so the arrival order of interleaved asynchronous events cannot produce
//! inconsistent state.

use devlink_common::conversation::{Conversation, ConversationId};
use devlink_common::identity::UserId;
use devlink_common::message::Message;

/// Token tying an in-flight history fetch to the selection that started
/// it. Committing with a stale token is a no-op, which is how a fetch for
/// a previously-selected conversation is kept from overwriting the
/// currently-selected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection(u64);

#[derive(Debug)]
struct ActiveConversation {
    peer: UserId,
    /// Learned from the first committed or reconciled message; a fresh
    /// conversation has no id until the server assigns one.
    conversation_id: Option<ConversationId>,
    messages: Vec<Message>,
}

/// In-memory store mirroring the server-authoritative conversation state.
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active: Option<ActiveConversation>,
    generation: u64,
    /// Set when a list fetch fails; the UI shows an error state instead of
    /// a conversation list.
    pub last_error: Option<String>,
}

impl ConversationStore {
    pub fn new() -> ConversationStore {
        ConversationStore::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_peer(&self) -> Option<&UserId> {
        self.active.as_ref().map(|a| &a.peer)
    }

    pub fn active_conversation_id(&self) -> Option<&ConversationId> {
        self.active.as_ref().and_then(|a| a.conversation_id.as_ref())
    }

    /// Messages of the active conversation, oldest first.
    pub fn active_messages(&self) -> &[Message] {
        self.active.as_ref().map(|a| a.messages.as_slice()).unwrap_or(&[])
    }

    /// Replace the conversation list after a successful fetch.
    pub fn set_conversations(&mut self, list: Vec<Conversation>) {
        self.conversations = list;
        self.last_error = None;
    }

    /// A list fetch failed: degrade to an empty list with an error state.
    pub fn fail_conversations(&mut self, error: String) {
        self.conversations.clear();
        self.last_error = Some(error);
    }

    /// Make `peer` the active conversation and hand back the token an
    /// in-flight history fetch must present to commit its result.
    pub fn select(&mut self, peer: UserId) -> Selection {
        self.generation += 1;
        self.active = Some(ActiveConversation {
            peer,
            conversation_id: None,
            messages: Vec::new(),
        });
        Selection(self.generation)
    }

    pub fn clear_selection(&mut self) {
        self.generation += 1;
        self.active = None;
    }

    /// Token for the current selection, if any. Handed to a resync fetch
    /// so its result is dropped when the user has since moved on.
    pub fn current_selection(&self) -> Option<Selection> {
        self.active.as_ref().map(|_| Selection(self.generation))
    }

    /// Commit a fetched message history. Returns false (and changes
    /// nothing) if the selection has moved on since the fetch started.
    pub fn commit_messages(&mut self, token: Selection, messages: Vec<Message>) -> bool {
        if token.0 != self.generation {
            tracing::debug!("dropping stale history fetch (selection changed)");
            return false;
        }
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.conversation_id.is_none() {
            active.conversation_id = messages.first().map(|m| m.conversation_id.clone());
        }
        active.messages = messages;
        true
    }

    /// Insert a locally-originated message immediately, before any push
    /// confirmation. No-op if the id is already present, so it commutes
    /// with [`reconcile_incoming`].
    pub fn append_optimistic(&mut self, message: Message) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.conversation_id.get_or_insert_with(|| message.conversation_id.clone());
        if active.messages.iter().any(|m| m.id == message.id) {
            return;
        }
        self.touch_preview(&message);
        if let Some(active) = self.active.as_mut() {
            active.messages.push(message);
        }
    }

    /// Merge a server-confirmed or push-delivered message.
    ///
    /// Idempotent by message id: an existing entry is overwritten in place
    /// (the server version wins over an optimistic copy), anything new is
    /// appended in arrival order. Messages for other conversations only
    /// refresh that conversation's list preview.
    pub fn reconcile_incoming(&mut self, message: Message) {
        self.touch_preview(&message);
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if let Some(id) = &active.conversation_id {
            if *id != message.conversation_id {
                return;
            }
        } else {
            active.conversation_id = Some(message.conversation_id.clone());
        }
        if let Some(existing) = active.messages.iter_mut().find(|m| m.id == message.id) {
            *existing = message;
        } else {
            active.messages.push(message);
        }
    }

    /// Keep the list view's preview in sync without refetching the list;
    /// the touched conversation bubbles to the top. Silent markers leave
    /// the preview alone.
    pub fn update_preview(&mut self, conversation_id: &ConversationId, message: &Message) {
        let Some(pos) = self.conversations.iter().position(|c| &c.id == conversation_id) else {
            return;
        };
        let mut conversation = self.conversations.remove(pos);
        if let Some(preview) = message.as_preview() {
            conversation.last_message = Some(preview);
        }
        conversation.updated_at = message.sent_at;
        self.conversations.insert(0, conversation);
    }

    /// Remove a conversation from the list; if it was the active one, the
    /// selection and message list are cleared as well.
    pub fn delete_conversation(&mut self, conversation_id: &ConversationId) {
        self.conversations.retain(|c| &c.id != conversation_id);
        let was_active = self
            .active
            .as_ref()
            .is_some_and(|a| a.conversation_id.as_ref() == Some(conversation_id));
        if was_active {
            self.clear_selection();
        }
    }

    fn touch_preview(&mut self, message: &Message) {
        let conversation_id = message.conversation_id.clone();
        self.update_preview(&conversation_id, message);
    }
}
