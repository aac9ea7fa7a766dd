//! Shared fixtures for integration tests
//! In-memory ChatApi double plus wire-shaped entity builders
#![allow(dead_code)]

use async_trait::async_trait;
use nexo_core::api::{Attachment, ChatApi, StartChatOutcome};
use nexo_core::blocks::BlockStatus;
use nexo_core::error::{Result, SyncError};
use nexo_core::events::{Notification, RoomSignal};
use nexo_core::types::{Conversation, ConversationStatus, IdRef, Message, User, UserId};
use nexo_core::{Config, Session};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};

pub const SELF_ID: &str = "me";
pub const SELF_NAME: &str = "ana";

pub fn self_user() -> User {
    user(SELF_ID, SELF_NAME)
}

pub fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        profile_picture_url: None,
        bio: None,
    }
}

/// Direct conversation between me and `other`, wire-shaped.
pub fn direct(
    id: &str,
    status: &str,
    other: (&str, &str),
    initiator: &str,
    unread_me: u32,
) -> Conversation {
    serde_json::from_value(json!({
        "_id": id,
        "isGroup": false,
        "status": status,
        "initiatedBy": initiator,
        "participants": [
            {"_id": SELF_ID, "username": SELF_NAME},
            {"_id": other.0, "username": other.1},
        ],
        "unreadCounts": {SELF_ID: unread_me},
    }))
    .unwrap()
}

pub fn group(
    id: &str,
    name: &str,
    founder: &str,
    admins: &[&str],
    members: &[&str],
) -> Conversation {
    let participants: Vec<_> = members
        .iter()
        .map(|m| json!({"_id": m, "username": m}))
        .collect();
    serde_json::from_value(json!({
        "_id": id,
        "isGroup": true,
        "status": "active",
        "groupName": name,
        "groupFounder": founder,
        "groupAdmin": admins,
        "participants": participants,
    }))
    .unwrap()
}

pub fn message(id: &str, conversation_id: &str, sender: (&str, &str), content: &str) -> Message {
    serde_json::from_value(json!({
        "_id": id,
        "conversationId": conversation_id,
        "sender": {"_id": sender.0, "username": sender.1},
        "content": content,
        "createdAt": "2024-05-01T12:00:00Z",
    }))
    .unwrap()
}

pub fn system_message(
    id: &str,
    conversation_id: &str,
    sender: (&str, &str),
    content: &str,
) -> Message {
    serde_json::from_value(json!({
        "_id": id,
        "conversationId": conversation_id,
        "sender": {"_id": sender.0, "username": sender.1},
        "type": "system",
        "content": content,
        "createdAt": "2024-05-01T12:00:00Z",
    }))
    .unwrap()
}

pub fn attachment(file_name: &str, mime_type: &str) -> Attachment {
    Attachment {
        file_name: file_name.to_string(),
        mime_type: mime_type.to_string(),
        bytes: vec![0u8; 4],
    }
}

#[derive(Default)]
pub struct MockState {
    pub conversations: Vec<Conversation>,
    pub messages: HashMap<String, Vec<Message>>,
    pub users: Vec<User>,
    pub blocked: Vec<UserId>,
    pub block_status: Option<BlockStatus>,
    pub fail_mark_read: bool,
    pub fail_fetch_messages: bool,
    /// When set, group role operations fail with this verbatim message.
    pub deny_group_ops: Option<String>,
    pub start_outcome: Option<StartChatOutcome>,
    pub calls: Vec<String>,
    sent_seq: usize,
}

/// In-memory backend double. Clones share state so tests can reconfigure it
/// after the session has taken ownership of its copy.
#[derive(Clone)]
pub struct MockApi {
    pub state: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub fn new(conversations: Vec<Conversation>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                conversations,
                ..MockState::default()
            })),
        }
    }

    pub fn with_messages(self, conversation_id: &str, messages: Vec<Message>) -> Self {
        self.state
            .lock()
            .unwrap()
            .messages
            .insert(conversation_id.to_string(), messages);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl ChatApi for MockApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        Ok(self.state.lock().unwrap().conversations.clone())
    }

    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let state = self.state.lock().unwrap();
        if state.fail_fetch_messages {
            return Err(SyncError::Transport("connection reset".to_string()));
        }
        Ok(state
            .messages
            .get(conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&self, conversation_id: &str, content: &str) -> Result<Message> {
        let mut state = self.state.lock().unwrap();
        state.sent_seq += 1;
        let id = format!("srv-{}", state.sent_seq);
        state.calls.push(format!("send:{}", conversation_id));
        Ok(message(&id, conversation_id, (SELF_ID, SELF_NAME), content))
    }

    async fn send_media_message(
        &self,
        conversation_id: &str,
        content: &str,
        files: &[Attachment],
    ) -> Result<Message> {
        let mut state = self.state.lock().unwrap();
        state.sent_seq += 1;
        let id = format!("srv-{}", state.sent_seq);
        state.calls.push(format!("send-media:{}", conversation_id));
        let mut msg = message(&id, conversation_id, (SELF_ID, SELF_NAME), content);
        msg.media_urls = files.iter().map(|f| format!("/media/{}", f.file_name)).collect();
        Ok(msg)
    }

    async fn mark_read(&self, conversation_id: &str) -> Result<Conversation> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("mark-read:{}", conversation_id));
        if state.fail_mark_read {
            return Err(SyncError::Transport("connection reset".to_string()));
        }
        let conv = state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| SyncError::Stale(format!("conversation {} is gone", conversation_id)))?;
        conv.unread_counts.insert(SELF_ID.to_string(), 0);
        Ok(conv.clone())
    }

    async fn start_conversation(&self, other_username: &str) -> Result<StartChatOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("start:{}", other_username));
        state
            .start_outcome
            .take()
            .ok_or_else(|| SyncError::Transport("no outcome staged".to_string()))
    }

    async fn accept_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("accept:{}", conversation_id));
        let conv = state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| SyncError::Stale(format!("conversation {} is gone", conversation_id)))?;
        conv.status = ConversationStatus::Active;
        Ok(conv.clone())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete:{}", conversation_id));
        state.conversations.retain(|c| c.id != conversation_id);
        Ok(())
    }

    async fn create_group(&self, name: &str, participants: &[UserId]) -> Result<Conversation> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("create-group:{}", name));
        let mut members = vec![SELF_ID.to_string()];
        members.extend(participants.iter().cloned());
        let member_refs: Vec<&str> = members.iter().map(String::as_str).collect();
        let conv = group("g-new", name, SELF_ID, &[SELF_ID], &member_refs);
        state.conversations.push(conv.clone());
        Ok(conv)
    }

    async fn add_members(&self, group_id: &str, members: &[UserId]) -> Result<Conversation> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("add-members:{}", group_id));
        let conv = state
            .conversations
            .iter_mut()
            .find(|c| c.id == group_id)
            .ok_or_else(|| SyncError::Stale(format!("group {} is gone", group_id)))?;
        for member in members {
            conv.participants.push(user(member, member));
        }
        Ok(conv.clone())
    }

    async fn promote_member(&self, group_id: &str, member_id: &str) -> Result<Conversation> {
        let mut state = self.state.lock().unwrap();
        if let Some(denied) = &state.deny_group_ops {
            return Err(SyncError::Permission(denied.clone()));
        }
        state.calls.push(format!("promote:{}:{}", group_id, member_id));
        let conv = state
            .conversations
            .iter_mut()
            .find(|c| c.id == group_id)
            .ok_or_else(|| SyncError::Stale(format!("group {} is gone", group_id)))?;
        conv.admins.push(IdRef::Raw(member_id.to_string()));
        Ok(conv.clone())
    }

    async fn demote_member(&self, group_id: &str, member_id: &str) -> Result<Conversation> {
        let mut state = self.state.lock().unwrap();
        if let Some(denied) = &state.deny_group_ops {
            return Err(SyncError::Permission(denied.clone()));
        }
        state.calls.push(format!("demote:{}:{}", group_id, member_id));
        let conv = state
            .conversations
            .iter_mut()
            .find(|c| c.id == group_id)
            .ok_or_else(|| SyncError::Stale(format!("group {} is gone", group_id)))?;
        conv.admins.retain(|a| a.id() != member_id);
        Ok(conv.clone())
    }

    async fn kick_member(&self, group_id: &str, member_id: &str) -> Result<Conversation> {
        let mut state = self.state.lock().unwrap();
        if let Some(denied) = &state.deny_group_ops {
            return Err(SyncError::Permission(denied.clone()));
        }
        state.calls.push(format!("kick:{}:{}", group_id, member_id));
        let conv = state
            .conversations
            .iter_mut()
            .find(|c| c.id == group_id)
            .ok_or_else(|| SyncError::Stale(format!("group {} is gone", group_id)))?;
        conv.participants.retain(|p| p.id != member_id);
        Ok(conv.clone())
    }

    async fn update_group_details(&self, group_id: &str, name: &str) -> Result<Conversation> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("rename:{}:{}", group_id, name));
        let conv = state
            .conversations
            .iter_mut()
            .find(|c| c.id == group_id)
            .ok_or_else(|| SyncError::Stale(format!("group {} is gone", group_id)))?;
        conv.group_name = Some(name.to_string());
        Ok(conv.clone())
    }

    async fn block_user(&self, user_id: &str) -> Result<String> {
        self.record(format!("block:{}", user_id));
        Ok("User blocked successfully.".to_string())
    }

    async fn unblock_user(&self, user_id: &str) -> Result<String> {
        self.record(format!("unblock:{}", user_id));
        Ok("User unblocked successfully.".to_string())
    }

    async fn check_block(&self, user_id: &str) -> Result<BlockStatus> {
        self.record(format!("check-block:{}", user_id));
        Ok(self
            .state
            .lock()
            .unwrap()
            .block_status
            .unwrap_or(BlockStatus {
                i_blocked_them: false,
                they_blocked_me: false,
            }))
    }

    async fn blocked_users(&self) -> Result<Vec<UserId>> {
        Ok(self.state.lock().unwrap().blocked.clone())
    }

    async fn bulk_delete_messages(&self, message_ids: &[String]) -> Result<()> {
        self.record(format!("bulk-delete:{}", message_ids.join(",")));
        Ok(())
    }

    async fn delete_message(&self, message_id: &str) -> Result<()> {
        self.record(format!("delete-message:{}", message_id));
        Ok(())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        self.record(format!("search:{}", query));
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .filter(|u| u.username.contains(query))
            .cloned()
            .collect())
    }
}

/// Build a refreshed session over the given backend double.
pub async fn session(
    api: MockApi,
) -> (
    Session<MockApi>,
    mpsc::UnboundedReceiver<RoomSignal>,
    broadcast::Receiver<Notification>,
) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let (mut session, rooms) = Session::init(api, self_user(), Config::default());
    let notifications = session.subscribe_notifications();
    session.refresh().await.unwrap();
    (session, rooms, notifications)
}

pub fn drain_notifications(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

pub fn drain_rooms(rx: &mut mpsc::UnboundedReceiver<RoomSignal>) -> Vec<RoomSignal> {
    let mut out = Vec::new();
    while let Ok(s) = rx.try_recv() {
        out.push(s);
    }
    out
}
