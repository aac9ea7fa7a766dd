/// Push events consumed from the realtime gateway and signals produced for the
/// UI layer
///
/// The gateway delivers `(event name, JSON payload)` pairs with no ordering
/// guarantee across conversations and at-most-once delivery. `decode` turns a
/// pair into a typed event or an error; a structurally incomplete payload is
/// rejected here so no handler ever partially applies one.
use crate::error::{Result, SyncError};
use crate::types::{Conversation, ConversationId, Message, MessageId, ProfilePatch, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Wire names used by the gateway.
pub const EV_NEW_CHAT_REQUEST: &str = "newChatRequest";
pub const EV_CHAT_REQUEST_ACCEPTED: &str = "chatRequestAccepted";
pub const EV_CHAT_READDED: &str = "chatReadded";
pub const EV_NEW_GROUP_CHAT: &str = "newGroupChat";
pub const EV_CONVERSATION_UPDATED: &str = "conversationUpdated";
pub const EV_CONVERSATION_DELETED: &str = "conversationDeleted";
pub const EV_BLOCKED_BY: &str = "blockedBy";
pub const EV_UNBLOCKED_BY: &str = "unblockedBy";
pub const EV_UNFRIENDED_BY: &str = "unfriendedBy";
pub const EV_USER_PROFILE_UPDATED: &str = "userProfileUpdated";
pub const EV_NEW_MESSAGE: &str = "newMessage";
pub const EV_MESSAGE_UPDATED: &str = "messageUpdated";
pub const EV_MESSAGES_BULK_UPDATED: &str = "messagesBulkUpdated";
pub const EV_MESSAGE_DELETED: &str = "messageDeleted";
pub const EV_UPDATE_USER_COUNT: &str = "updateUserCount";
pub const EV_UPDATE_ONLINE_USERS: &str = "updateOnlineUsers";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNotice {
    pub blocker_id: UserId,
    pub blocker_name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
}

#[derive(Debug, Clone)]
pub enum PushEvent {
    NewChatRequest(Conversation),
    ChatRequestAccepted(Conversation),
    ChatReadded(Conversation),
    NewGroupChat(Conversation),
    ConversationUpdated(Conversation),
    ConversationDeleted(ConversationId),
    BlockedBy(BlockNotice),
    UnblockedBy(BlockNotice),
    UnfriendedBy { unfriender_name: String },
    UserProfileUpdated(ProfilePatch),
    NewMessage(Message),
    MessageUpdated(Message),
    MessagesBulkUpdated(Vec<Message>),
    MessageDeleted(MessageRef),
    UserCount(u64),
    OnlineUsers(HashMap<UserId, serde_json::Value>),
}

impl PushEvent {
    /// Decode one gateway delivery. Unknown names and malformed payloads are
    /// errors; the caller drops and logs them.
    pub fn decode(name: &str, payload: serde_json::Value) -> Result<PushEvent> {
        let event = match name {
            EV_NEW_CHAT_REQUEST => PushEvent::NewChatRequest(serde_json::from_value(payload)?),
            EV_CHAT_REQUEST_ACCEPTED => {
                PushEvent::ChatRequestAccepted(serde_json::from_value(payload)?)
            }
            EV_CHAT_READDED => PushEvent::ChatReadded(serde_json::from_value(payload)?),
            EV_NEW_GROUP_CHAT => PushEvent::NewGroupChat(serde_json::from_value(payload)?),
            EV_CONVERSATION_UPDATED => {
                PushEvent::ConversationUpdated(serde_json::from_value(payload)?)
            }
            EV_CONVERSATION_DELETED => {
                PushEvent::ConversationDeleted(serde_json::from_value(payload)?)
            }
            EV_BLOCKED_BY => PushEvent::BlockedBy(serde_json::from_value(payload)?),
            EV_UNBLOCKED_BY => PushEvent::UnblockedBy(serde_json::from_value(payload)?),
            EV_UNFRIENDED_BY => {
                #[derive(Deserialize)]
                #[serde(rename_all = "camelCase")]
                struct Payload {
                    unfriender_name: String,
                }
                let p: Payload = serde_json::from_value(payload)?;
                PushEvent::UnfriendedBy {
                    unfriender_name: p.unfriender_name,
                }
            }
            EV_USER_PROFILE_UPDATED => {
                PushEvent::UserProfileUpdated(serde_json::from_value(payload)?)
            }
            EV_NEW_MESSAGE => PushEvent::NewMessage(serde_json::from_value(payload)?),
            EV_MESSAGE_UPDATED => PushEvent::MessageUpdated(serde_json::from_value(payload)?),
            EV_MESSAGES_BULK_UPDATED => {
                PushEvent::MessagesBulkUpdated(serde_json::from_value(payload)?)
            }
            EV_MESSAGE_DELETED => PushEvent::MessageDeleted(serde_json::from_value(payload)?),
            EV_UPDATE_USER_COUNT => PushEvent::UserCount(serde_json::from_value(payload)?),
            EV_UPDATE_ONLINE_USERS => PushEvent::OnlineUsers(serde_json::from_value(payload)?),
            other => {
                return Err(SyncError::InvalidPayload(format!(
                    "unknown event '{}'",
                    other
                )))
            }
        };
        Ok(event)
    }
}

/// Notification text events produced for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Somebody sent me a chat request.
    NewRequest { from: String },
    /// A request I initiated was accepted.
    RequestAccepted { by: String },
    /// A previously removed counterpart added me back.
    Readded { by: String },
    /// I was added to a group.
    AddedToGroup { group_name: String },
    /// I was removed from a group I had open or listed.
    KickedFromGroup { group_name: String },
    /// The conversation disappeared (e.g. the counterpart deleted their account).
    ConversationGone { conversation_id: ConversationId },
    BlockedBy { by: String },
    UnfriendedBy { by: String },
    /// Inbound system message (membership changes, renames, ...).
    System { content: String },
}

/// Room membership control for the push channel. Leaving the previous room
/// stops per-message events from being misattributed after a switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomSignal {
    Join(ConversationId),
    Leave,
}
