/// Authenticated session: owns the stores and drives every REST intent
///
/// One `Session` exists per login and is torn down entirely on logout. All
/// mutation is single-threaded: handlers and intents run to completion, REST
/// calls are the only suspension points, and a selection generation counter
/// discards in-flight loads that no longer match the selected conversation.
///
/// UI layers read snapshots and submit intents; they never mutate the stores
/// directly. REST responses and push events merge through the same store
/// functions (see `reconciler.rs` for the push side).
use crate::api::{Attachment, ChatApi, StartChatOutcome};
use crate::blocks::BlockTracker;
use crate::cache::MessageCache;
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::events::{Notification, RoomSignal};
use crate::permissions::{self, MemberActions};
use crate::store::ConversationStore;
use crate::types::{Conversation, ConversationId, Message, MessageId, User, UserId};
use crate::unread::UnreadAnchor;
use std::collections::HashSet;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct Session<A: ChatApi> {
    /// Instance id, for log correlation only.
    pub(crate) id: String,
    pub(crate) api: A,
    pub(crate) self_user: User,
    pub(crate) config: Config,

    pub(crate) conversations: ConversationStore,
    pub(crate) cache: MessageCache,
    pub(crate) blocks: BlockTracker,

    /// Currently selected conversation, if any.
    pub(crate) open_id: Option<ConversationId>,
    /// Bumped on every selection change; stale loads compare against it.
    pub(crate) selection_seq: u64,
    /// Separator index frozen when the history load lands; streamed-in
    /// messages do not move it.
    pub(crate) unread_anchor: Option<usize>,
    /// True when composition is disabled by a block in either direction.
    pub(crate) send_gate: bool,
    /// Message ids already merged this session; makes redelivered message
    /// events no-ops even for conversations that are not open. Grows for the
    /// life of the session and is reclaimed at teardown with everything else.
    pub(crate) seen_messages: HashSet<MessageId>,

    pub(crate) online_users: HashSet<UserId>,
    pub(crate) user_count: u64,

    pub(crate) notifications: broadcast::Sender<Notification>,
    pub(crate) rooms: mpsc::UnboundedSender<RoomSignal>,
}

impl<A: ChatApi> Session<A> {
    /// Build a fresh session. The returned receiver carries room join/leave
    /// signals for the push channel; notification receivers are obtained via
    /// [`subscribe_notifications`](Self::subscribe_notifications).
    pub fn init(
        api: A,
        self_user: User,
        config: Config,
    ) -> (Self, mpsc::UnboundedReceiver<RoomSignal>) {
        let id = Uuid::new_v4().to_string();
        let (notifications, _) = broadcast::channel(config.notification_capacity);
        let (rooms, room_rx) = mpsc::unbounded_channel();
        info!(session = %id, user = %self_user.id, "session initialized");

        let session = Self {
            id,
            api,
            self_user,
            config,
            conversations: ConversationStore::new(),
            cache: MessageCache::new(),
            blocks: BlockTracker::new(),
            open_id: None,
            selection_seq: 0,
            unread_anchor: None,
            send_gate: false,
            seen_messages: HashSet::new(),
            online_users: HashSet::new(),
            user_count: 0,
            notifications,
            rooms,
        };
        (session, room_rx)
    }

    /// Tear down on logout. Nothing survives the session boundary.
    pub fn teardown(mut self) {
        if self.open_id.is_some() {
            self.signal_room(RoomSignal::Leave);
        }
        self.cache.clear();
        info!(session = %self.id, "session torn down");
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    // ─── Snapshots for the UI layer ──────────────────────────────────────────

    pub fn self_user(&self) -> &User {
        &self.self_user
    }

    pub fn pending_requests(&self) -> Vec<&Conversation> {
        self.conversations.list_pending(&self.self_user.id)
    }

    pub fn active_direct(&self) -> Vec<&Conversation> {
        self.conversations.list_active_direct()
    }

    pub fn active_groups(&self) -> Vec<&Conversation> {
        self.conversations.list_active_groups()
    }

    pub fn open_conversation_id(&self) -> Option<&str> {
        self.open_id.as_deref()
    }

    pub fn open_conversation(&self) -> Option<&Conversation> {
        self.open_id.as_deref().and_then(|id| self.conversations.get(id))
    }

    pub fn messages(&self) -> &[Message] {
        self.cache.messages()
    }

    /// Index of the one-time "new messages" separator, fixed at open time.
    pub fn unread_anchor_index(&self) -> Option<usize> {
        self.unread_anchor
    }

    pub fn send_gate(&self) -> bool {
        self.send_gate
    }

    pub fn has_blocked(&self, user_id: &str) -> bool {
        self.blocks.has_blocked(user_id)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.online_users.contains(user_id)
    }

    pub fn user_count(&self) -> u64 {
        self.user_count
    }

    /// Action flags for one member row of the open group.
    pub fn member_actions(&self, target: &str) -> Option<MemberActions> {
        let conv = self.open_conversation()?;
        if !conv.is_group {
            return None;
        }
        Some(permissions::actions_for(conv, &self.self_user.id, target))
    }

    // ─── Session bootstrap ───────────────────────────────────────────────────

    /// Fetch the conversation list and my block list. Called once after login;
    /// safe to call again to resynchronize.
    pub async fn refresh(&mut self) -> Result<()> {
        let conversations = self.api.list_conversations().await?;
        debug!(session = %self.id, count = conversations.len(), "conversation list fetched");
        self.conversations
            .replace_all(conversations, &self.self_user.id);

        let blocked = self.api.blocked_users().await?;
        self.blocks.load(blocked);
        Ok(())
    }

    // ─── Conversation selection ──────────────────────────────────────────────

    /// Select a conversation: load its history, fix the unread anchor, join
    /// its room, check the block state (direct chats) and mark it read.
    pub async fn select_conversation(&mut self, conversation_id: &str) -> Result<()> {
        let Some(conv) = self.conversations.get(conversation_id).cloned() else {
            // Concurrently deleted; benign.
            debug!(conversation = conversation_id, "select on unknown conversation");
            return Ok(());
        };

        // Switching cancels interest in the previous room.
        if self.open_id.is_some() {
            self.signal_room(RoomSignal::Leave);
        }
        self.selection_seq += 1;
        let seq = self.selection_seq;
        self.open_id = Some(conversation_id.to_string());
        self.cache.clear();
        self.unread_anchor = None;
        self.send_gate = false;

        if !conv.is_active() {
            // Pending request: selectable, but no history is visible until
            // accepted.
            return Ok(());
        }

        // Capture the count before the mark-read call zeroes it server-side.
        let captured = UnreadAnchor::capture(conv.unread_for(&self.self_user.id));

        // History loads before the room join and the mark-read, so a failed
        // load leaves no half-applied selection behind.
        let loaded = match self.api.fetch_messages(conversation_id).await {
            Ok(loaded) => loaded,
            Err(e) => {
                if seq == self.selection_seq {
                    self.open_id = None;
                }
                return Err(e);
            }
        };
        if seq != self.selection_seq {
            debug!(conversation = conversation_id, "discarding stale message load");
            return Ok(());
        }
        self.cache.open(conversation_id, loaded);
        // Frozen here; messages streaming in do not move the separator.
        self.unread_anchor = captured.anchor_index(self.cache.len());
        self.signal_room(RoomSignal::Join(conversation_id.to_string()));

        if !conv.is_group {
            if let Some(other) = conv.other_participant(&self.self_user.id) {
                let other_id = other.id.clone();
                match self.api.check_block(&other_id).await {
                    Ok(status) => {
                        if seq == self.selection_seq {
                            self.send_gate = status.gated();
                        }
                    }
                    Err(e) => warn!(user = %other_id, error = %e, "block check failed"),
                }
            }
        }

        self.conversations
            .mark_read_local(conversation_id, &self.self_user.id);
        match self.api.mark_read(conversation_id).await {
            Ok(updated) => {
                self.conversations.confirm_read(conversation_id);
                self.conversations.upsert(updated, &self.self_user.id);
            }
            // The optimistic zero stays; the next refresh reconciles.
            Err(e) => warn!(conversation = conversation_id, error = %e, "mark read failed"),
        }
        Ok(())
    }

    /// Deselect without deleting anything.
    pub fn close_conversation(&mut self) {
        if self.open_id.take().is_some() {
            self.signal_room(RoomSignal::Leave);
        }
        self.selection_seq += 1;
        self.cache.clear();
        self.unread_anchor = None;
        self.send_gate = false;
    }

    // ─── Messaging ───────────────────────────────────────────────────────────

    /// Send a text message to the open conversation. The response is appended
    /// through the same idempotent merge the push echo uses.
    pub async fn send_text(&mut self, content: &str) -> Result<()> {
        let conversation_id = self.sendable_conversation()?;
        if content.trim().is_empty() {
            return Ok(());
        }
        let message = self.api.send_message(&conversation_id, content).await?;
        self.seen_messages.insert(message.id.clone());
        self.cache.append(message);
        Ok(())
    }

    /// Send text plus up to five files. `document_mode` mirrors the document
    /// picker, which refuses images and videos.
    pub async fn send_attachments(
        &mut self,
        content: &str,
        files: &[Attachment],
        document_mode: bool,
    ) -> Result<()> {
        if files.is_empty() {
            return self.send_text(content).await;
        }
        let conversation_id = self.sendable_conversation()?;

        if files.len() > self.config.max_attachments {
            return Err(SyncError::Validation(format!(
                "a message can carry at most {} files",
                self.config.max_attachments
            )));
        }
        for file in files {
            if let Some(ext) = file.extension() {
                if self.config.blocked_extensions.iter().any(|b| *b == ext) {
                    return Err(SyncError::Validation(format!(
                        "files of type .{} are not allowed",
                        ext
                    )));
                }
            }
        }
        if document_mode && files.iter().any(Attachment::is_media) {
            return Err(SyncError::Validation(
                "images and videos cannot be sent as documents".to_string(),
            ));
        }

        let message = self
            .api
            .send_media_message(&conversation_id, content, files)
            .await?;
        self.seen_messages.insert(message.id.clone());
        self.cache.append(message);
        Ok(())
    }

    fn sendable_conversation(&self) -> Result<ConversationId> {
        let Some(id) = self.open_id.as_deref() else {
            return Err(SyncError::Validation(
                "no conversation is open".to_string(),
            ));
        };
        let Some(conv) = self.conversations.get(id) else {
            return Err(SyncError::Stale(format!("conversation {} is gone", id)));
        };
        if !conv.is_active() {
            return Err(SyncError::Validation(
                "the conversation is still pending".to_string(),
            ));
        }
        if self.send_gate {
            return Err(SyncError::Validation(
                "messaging is blocked in this conversation".to_string(),
            ));
        }
        Ok(id.to_string())
    }

    /// Soft-delete a batch of my messages. The visible patch arrives via the
    /// bulk-update push event.
    pub async fn bulk_delete_messages(&mut self, message_ids: &[String]) -> Result<()> {
        if message_ids.is_empty() {
            return Ok(());
        }
        match self.api.bulk_delete_messages(message_ids).await {
            Ok(()) => Ok(()),
            Err(SyncError::Stale(reason)) => {
                debug!(%reason, "bulk delete hit deleted messages");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Hard-delete a single message (viewer-initiated media removal). The
    /// removal from the visible list arrives via the delete push event.
    pub async fn delete_message(&mut self, message_id: &str) -> Result<()> {
        match self.api.delete_message(message_id).await {
            Ok(()) => Ok(()),
            Err(SyncError::Stale(reason)) => {
                debug!(%reason, "delete on already-deleted message");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // ─── Direct conversation lifecycle ───────────────────────────────────────

    pub async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.api.search_users(query).await
    }

    /// Start (or resume) a conversation with another user. An existing active
    /// conversation is opened directly.
    pub async fn start_chat(&mut self, other_username: &str) -> Result<StartChatOutcome> {
        let outcome = self.api.start_conversation(other_username).await?;
        match &outcome {
            StartChatOutcome::RequestSent(conv) => {
                self.conversations.upsert(conv.clone(), &self.self_user.id);
            }
            StartChatOutcome::Existing(conv) => {
                self.conversations.upsert(conv.clone(), &self.self_user.id);
                if conv.is_active() {
                    let id = conv.id.clone();
                    self.select_conversation(&id).await?;
                }
            }
        }
        Ok(outcome)
    }

    /// Accept a pending request and open the activated conversation.
    pub async fn accept_request(&mut self, conversation_id: &str) -> Result<()> {
        let activated = self.api.accept_conversation(conversation_id).await?;
        let id = activated.id.clone();
        self.conversations.upsert(activated, &self.self_user.id);
        self.select_conversation(&id).await
    }

    /// Reject a pending request. Same server operation as unfriending.
    pub async fn reject_request(&mut self, conversation_id: &str) -> Result<()> {
        self.delete_or_leave_conversation(conversation_id).await
    }

    /// Unfriend (direct) or leave (group). The conversation disappears from my
    /// lists; the counterpart keeps their history.
    pub async fn delete_or_leave_conversation(&mut self, conversation_id: &str) -> Result<()> {
        match self.api.delete_conversation(conversation_id).await {
            Ok(()) | Err(SyncError::Stale(_)) => {}
            Err(e) => return Err(e),
        }
        self.conversations.remove(conversation_id);
        if self.open_id.as_deref() == Some(conversation_id) {
            self.close_conversation();
        }
        Ok(())
    }

    // ─── Blocking ────────────────────────────────────────────────────────────

    /// Block a user. Returns the server's confirmation message.
    pub async fn block_user(&mut self, user_id: &str) -> Result<String> {
        let message = self.api.block_user(user_id).await?;
        self.blocks.block(user_id);
        self.conversations
            .set_block_flag(&user_id.to_string(), true);
        if self.open_direct_counterpart_is(user_id) {
            self.send_gate = true;
        }
        Ok(message)
    }

    /// Unblock a user. The gate is only lifted after an authoritative
    /// two-direction re-check; "have they blocked me" is never assumed.
    pub async fn unblock_user(&mut self, user_id: &str) -> Result<String> {
        let message = self.api.unblock_user(user_id).await?;
        self.blocks.unblock(user_id);
        self.conversations
            .set_block_flag(&user_id.to_string(), false);
        if self.open_direct_counterpart_is(user_id) {
            match self.api.check_block(user_id).await {
                Ok(status) => self.send_gate = status.gated(),
                Err(e) => warn!(user = user_id, error = %e, "block re-check failed"),
            }
        }
        Ok(message)
    }

    /// Block a user and delete the conversation in one intent.
    pub async fn block_and_unfriend(&mut self, user_id: &str) -> Result<()> {
        let Some(conversation_id) = self
            .conversations
            .list_active_direct()
            .iter()
            .find(|c| c.has_participant(user_id))
            .map(|c| c.id.clone())
        else {
            return Err(SyncError::Stale(format!(
                "no direct conversation with {}",
                user_id
            )));
        };
        self.api.block_user(user_id).await?;
        self.blocks.block(user_id);
        self.delete_or_leave_conversation(&conversation_id).await
    }

    pub(crate) fn open_direct_counterpart_is(&self, user_id: &str) -> bool {
        match self.open_conversation() {
            Some(conv) if !conv.is_group => conv
                .other_participant(&self.self_user.id)
                .map(|u| u.id == user_id)
                .unwrap_or(false),
            _ => false,
        }
    }

    // ─── Groups ──────────────────────────────────────────────────────────────

    /// Create a group and open it.
    pub async fn create_group(&mut self, name: &str, members: &[UserId]) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SyncError::Validation(
                "the group name cannot be empty".to_string(),
            ));
        }
        if members.is_empty() {
            return Err(SyncError::Validation(
                "a group needs at least one member".to_string(),
            ));
        }
        let group = self.api.create_group(name, members).await?;
        let id = group.id.clone();
        self.conversations.upsert(group, &self.self_user.id);
        self.select_conversation(&id).await
    }

    pub async fn add_members(&mut self, group_id: &str, members: &[UserId]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let updated = self.api.add_members(group_id, members).await?;
        self.conversations.upsert(updated, &self.self_user.id);
        Ok(())
    }

    pub async fn promote_member(&mut self, group_id: &str, member_id: &str) -> Result<()> {
        let updated = self.api.promote_member(group_id, member_id).await?;
        self.conversations.upsert(updated, &self.self_user.id);
        Ok(())
    }

    pub async fn demote_member(&mut self, group_id: &str, member_id: &str) -> Result<()> {
        let updated = self.api.demote_member(group_id, member_id).await?;
        self.conversations.upsert(updated, &self.self_user.id);
        Ok(())
    }

    pub async fn kick_member(&mut self, group_id: &str, member_id: &str) -> Result<()> {
        let updated = self.api.kick_member(group_id, member_id).await?;
        self.conversations.upsert(updated, &self.self_user.id);
        Ok(())
    }

    pub async fn rename_group(&mut self, group_id: &str, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SyncError::Validation(
                "the group name cannot be empty".to_string(),
            ));
        }
        let updated = self.api.update_group_details(group_id, name).await?;
        self.conversations.upsert(updated, &self.self_user.id);
        Ok(())
    }

    // ─── Internal helpers ────────────────────────────────────────────────────

    pub(crate) fn notify(&self, notification: Notification) {
        // No receivers is fine; the UI may not have subscribed yet.
        let _ = self.notifications.send(notification);
    }

    pub(crate) fn signal_room(&self, signal: RoomSignal) {
        if self.rooms.send(signal).is_err() {
            debug!(session = %self.id, "room signal receiver dropped");
        }
    }

    /// Local eviction used when a push event closes the open conversation.
    pub(crate) fn close_open_locally(&mut self) {
        self.open_id = None;
        self.selection_seq += 1;
        self.cache.clear();
        self.unread_anchor = None;
        self.send_gate = false;
        self.signal_room(RoomSignal::Leave);
    }
}
