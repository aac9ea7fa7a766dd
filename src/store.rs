/// Conversation storage: authoritative in-memory table keyed by id
///
/// Both REST responses and push events merge through `upsert`, so the two
/// paths share a single reconciliation code path. The pending/active views are
/// recomputed on every read, never cached separately.
use crate::types::{Conversation, ConversationId, ProfilePatch, UserId};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: HashMap<ConversationId, Conversation>,
    /// Conversations whose unread count for self was optimistically zeroed by
    /// a local mark-read that the server has not confirmed yet.
    pending_reads: HashSet<ConversationId>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.conversations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Replace-by-id, last-write-wins on the whole object. The only exception
    /// is self's unread count while a local mark-read is in flight: a stale
    /// server copy must not resurrect the pre-read count.
    pub fn upsert(&mut self, mut conversation: Conversation, self_id: &str) {
        if self.pending_reads.contains(&conversation.id) {
            conversation
                .unread_counts
                .insert(self_id.to_string(), 0);
        }
        self.conversations
            .insert(conversation.id.clone(), conversation);
    }

    /// Authoritative resynchronization from a full list fetch. Conversations
    /// absent from the response are dropped; in-flight read confirmations keep
    /// masking self's unread count.
    pub fn replace_all(&mut self, conversations: Vec<Conversation>, self_id: &str) {
        self.conversations.clear();
        for conversation in conversations {
            self.upsert(conversation, self_id);
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Conversation> {
        self.pending_reads.remove(id);
        self.conversations.remove(id)
    }

    /// Optimistically zero self's unread count before the mark-read call.
    pub fn mark_read_local(&mut self, id: &str, self_id: &str) {
        if let Some(conv) = self.conversations.get_mut(id) {
            conv.unread_counts.insert(self_id.to_string(), 0);
            self.pending_reads.insert(id.to_string());
        }
    }

    /// Server confirmed the mark-read; from here on its counts are trusted.
    pub fn confirm_read(&mut self, id: &str) {
        self.pending_reads.remove(id);
    }

    /// Badge bump for a message in a conversation that is not open. A genuinely
    /// new message supersedes any in-flight read confirmation.
    pub fn increment_unread(&mut self, id: &str, self_id: &str) {
        match self.conversations.get_mut(id) {
            Some(conv) => {
                self.pending_reads.remove(id);
                *conv
                    .unread_counts
                    .entry(self_id.to_string())
                    .or_insert(0) += 1;
            }
            // The initial list fetch may not have completed yet; the later
            // REST fetch supplies the full state.
            None => debug!(conversation = id, "unread bump for unknown conversation"),
        }
    }

    pub fn apply_participant_patch(&mut self, patch: &ProfilePatch) {
        for conv in self.conversations.values_mut() {
            for participant in conv.participants.iter_mut() {
                patch.apply_to(participant);
            }
        }
    }

    /// Flip the directional block annotation on every direct conversation with
    /// the given user.
    pub fn set_block_flag(&mut self, other_user_id: &UserId, blocked: bool) {
        for conv in self.conversations.values_mut() {
            if !conv.is_group && conv.has_participant(other_user_id) {
                conv.has_block = blocked;
            }
        }
    }

    /// Direct pending conversations addressed to me (initiated by someone else).
    pub fn list_pending(&self, self_id: &str) -> Vec<&Conversation> {
        self.conversations
            .values()
            .filter(|c| c.is_pending_request_for(self_id))
            .collect()
    }

    pub fn list_active_direct(&self) -> Vec<&Conversation> {
        self.conversations
            .values()
            .filter(|c| !c.is_group && c.is_active())
            .collect()
    }

    pub fn list_active_groups(&self) -> Vec<&Conversation> {
        self.conversations
            .values()
            .filter(|c| c.is_group && c.is_active())
            .collect()
    }
}
