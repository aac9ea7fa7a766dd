/// Message stream cache: per-open-conversation ordered message list
///
/// Scoped to exactly one conversation at a time; opening another conversation
/// discards the previous cache. Ordering is load order concatenated with
/// arrival order; no timestamp re-sort (the push channel guarantees per-room
/// ordering).
use crate::types::{ConversationId, Message, ProfilePatch};
use tracing::debug;

#[derive(Debug, Default)]
pub struct MessageCache {
    conversation_id: Option<ConversationId>,
    messages: Vec<Message>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescope the cache to a freshly loaded conversation.
    pub fn open(&mut self, conversation_id: &str, loaded: Vec<Message>) {
        self.conversation_id = Some(conversation_id.to_string());
        self.messages = loaded;
    }

    pub fn clear(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
    }

    pub fn is_open(&self, conversation_id: &str) -> bool {
        self.conversation_id.as_deref() == Some(conversation_id)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Idempotent append: the REST send response and the push echo can both
    /// arrive; the second one is a no-op.
    pub fn append(&mut self, message: Message) -> bool {
        if !self.is_open(&message.conversation_id) {
            debug!(
                message = %message.id,
                conversation = %message.conversation_id,
                "append for a conversation that is not open"
            );
            return false;
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Replace an existing message in place (soft delete, bulk update).
    pub fn patch(&mut self, message: Message) -> bool {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(slot) => {
                *slot = message;
                true
            }
            None => false,
        }
    }

    /// Hard removal from the visible list.
    pub fn remove(&mut self, message_id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != message_id);
        self.messages.len() != before
    }

    pub fn apply_sender_patch(&mut self, patch: &ProfilePatch) {
        for message in self.messages.iter_mut() {
            patch.apply_to(&mut message.sender);
        }
    }
}
