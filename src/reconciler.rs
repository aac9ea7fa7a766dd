/// Realtime event reconciliation
///
/// Every push event merges through the same store functions the REST path
/// uses, so a REST echo followed by the push copy (or the reverse) converges to
/// the same state. Handlers are idempotent and run to completion; events
/// touching independent entities commute.
///
/// A malformed delivery is rejected at decode time and dropped with a warning;
/// no handler ever observes a partially valid payload.
use crate::api::ChatApi;
use crate::events::{BlockNotice, Notification, PushEvent};
use crate::session::Session;
use crate::types::{Conversation, Message, MessageState};
use chrono::Utc;
use tracing::{debug, warn};

impl<A: ChatApi> Session<A> {
    /// Decode and apply one gateway delivery.
    pub async fn apply_raw(&mut self, name: &str, payload: serde_json::Value) {
        match PushEvent::decode(name, payload) {
            Ok(event) => self.apply_event(event).await,
            Err(e) => warn!(event = name, error = %e, "dropping malformed push event"),
        }
    }

    pub async fn apply_event(&mut self, event: PushEvent) {
        match event {
            PushEvent::NewChatRequest(conv) => self.on_new_chat_request(conv),
            PushEvent::ChatRequestAccepted(conv) => self.on_request_accepted(conv),
            PushEvent::ChatReadded(conv) => self.on_chat_readded(conv),
            PushEvent::NewGroupChat(conv) => self.on_new_group_chat(conv),
            PushEvent::ConversationUpdated(conv) => self.on_conversation_updated(conv),
            PushEvent::ConversationDeleted(id) => self.on_conversation_deleted(&id),
            PushEvent::BlockedBy(notice) => self.on_blocked_by(notice),
            PushEvent::UnblockedBy(notice) => self.on_unblocked_by(notice).await,
            PushEvent::UnfriendedBy { unfriender_name } => {
                self.notify(Notification::UnfriendedBy {
                    by: unfriender_name,
                });
            }
            PushEvent::UserProfileUpdated(patch) => {
                if patch.user_id == self.self_user.id {
                    patch.apply_to(&mut self.self_user);
                }
                self.conversations.apply_participant_patch(&patch);
                self.cache.apply_sender_patch(&patch);
            }
            PushEvent::NewMessage(message) => self.on_new_message(message),
            PushEvent::MessageUpdated(message) => self.on_message_updated(message),
            PushEvent::MessagesBulkUpdated(messages) => {
                for message in messages {
                    self.on_message_updated(message);
                }
            }
            PushEvent::MessageDeleted(r) => {
                if self.cache.is_open(&r.conversation_id) {
                    self.cache.remove(&r.message_id);
                }
            }
            PushEvent::UserCount(count) => self.user_count = count,
            PushEvent::OnlineUsers(users) => {
                self.online_users = users.into_keys().collect();
            }
        }
    }

    fn on_new_chat_request(&mut self, conv: Conversation) {
        let first = !self.conversations.contains(&conv.id);
        let from = conv
            .initiated_by_id()
            .and_then(|initiator| conv.participants.iter().find(|p| p.id == initiator))
            .map(|p| p.username.clone());
        let addressed_to_me = conv.is_pending_request_for(&self.self_user.id);
        self.conversations.upsert(conv, &self.self_user.id);

        // Redelivery of an already known request stays silent.
        if first && addressed_to_me {
            if let Some(from) = from {
                self.notify(Notification::NewRequest { from });
            }
        }
    }

    fn on_request_accepted(&mut self, conv: Conversation) {
        let was_active = self
            .conversations
            .get(&conv.id)
            .map(Conversation::is_active)
            .unwrap_or(false);
        let i_initiated = conv.initiated_by_id() == Some(self.self_user.id.as_str());
        let by = conv
            .other_participant(&self.self_user.id)
            .map(|p| p.username.clone());
        self.conversations.upsert(conv, &self.self_user.id);

        // Only the requester gets the acceptance toast, and only once.
        if !was_active && i_initiated {
            if let Some(by) = by {
                self.notify(Notification::RequestAccepted { by });
            }
        }
    }

    fn on_chat_readded(&mut self, conv: Conversation) {
        let first = !self.conversations.contains(&conv.id);
        let by = conv
            .other_participant(&self.self_user.id)
            .map(|p| p.username.clone());
        self.conversations.upsert(conv, &self.self_user.id);

        if first {
            if let Some(by) = by {
                self.notify(Notification::Readded { by });
            }
        }
    }

    fn on_new_group_chat(&mut self, conv: Conversation) {
        let first = !self.conversations.contains(&conv.id);
        let group_name = conv.group_name.clone().unwrap_or_default();
        self.conversations.upsert(conv, &self.self_user.id);

        if first {
            self.notify(Notification::AddedToGroup { group_name });
        }
    }

    /// Full-object refresh for membership, roles, name and picture changes.
    /// A snapshot that no longer lists me means I was removed.
    fn on_conversation_updated(&mut self, conv: Conversation) {
        if conv.has_participant(&self.self_user.id) {
            self.conversations.upsert(conv, &self.self_user.id);
            return;
        }

        let id = conv.id.clone();
        let known = self.conversations.remove(&id).is_some();
        if self.open_id.as_deref() == Some(id.as_str()) {
            self.close_open_locally();
            self.notify(Notification::KickedFromGroup {
                group_name: conv.group_name.clone().unwrap_or_default(),
            });
        } else if known && conv.is_group {
            self.notify(Notification::KickedFromGroup {
                group_name: conv.group_name.clone().unwrap_or_default(),
            });
        }
    }

    fn on_conversation_deleted(&mut self, conversation_id: &str) {
        let known = self.conversations.remove(conversation_id).is_some();
        if self.open_id.as_deref() == Some(conversation_id) {
            self.close_open_locally();
        }
        if known {
            self.notify(Notification::ConversationGone {
                conversation_id: conversation_id.to_string(),
            });
        } else {
            debug!(conversation = conversation_id, "delete for unknown conversation");
        }
    }

    /// The gate engages within this handler invocation; no send can slip
    /// through between the event and the flag.
    fn on_blocked_by(&mut self, notice: BlockNotice) {
        self.conversations.set_block_flag(&notice.blocker_id, true);
        if self.open_direct_counterpart_is(&notice.blocker_id) {
            self.send_gate = true;
        }
        self.notify(Notification::BlockedBy {
            by: notice.blocker_name,
        });
    }

    /// Lifting the gate requires the authoritative two-direction answer: I may
    /// still be blocking them.
    async fn on_unblocked_by(&mut self, notice: BlockNotice) {
        self.conversations
            .set_block_flag(&notice.blocker_id, false);
        if !self.open_direct_counterpart_is(&notice.blocker_id) {
            return;
        }
        match self.api.check_block(&notice.blocker_id).await {
            Ok(status) => self.send_gate = status.gated(),
            Err(e) => {
                warn!(user = %notice.blocker_id, error = %e, "block re-check failed");
            }
        }
    }

    fn on_new_message(&mut self, message: Message) {
        // At-most-once from the gateway, but a reconnect can replay.
        if !self.seen_messages.insert(message.id.clone()) {
            return;
        }
        let from_me = message.sender.id == self.self_user.id;

        // Membership changes and renames arrive as system messages; the actor
        // already saw the result of their own intent.
        if message.is_system() && !from_me {
            self.notify(Notification::System {
                content: message.content.clone(),
            });
        }

        if self.cache.is_open(&message.conversation_id) {
            self.cache.append(message);
        } else if !from_me {
            self.conversations
                .increment_unread(&message.conversation_id, &self.self_user.id);
        }
    }

    /// The backend only rewrites a message on soft deletion, so an update
    /// event doubles as the deletion tag.
    fn on_message_updated(&mut self, mut message: Message) {
        if !self.cache.is_open(&message.conversation_id) {
            return;
        }
        message.state = MessageState::Deleted {
            by: message.sender.id.clone(),
            at: Utc::now(),
        };
        if !self.cache.patch(message) {
            debug!("update for a message outside the loaded window");
        }
    }
}
