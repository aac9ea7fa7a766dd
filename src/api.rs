/// REST backend interface
///
/// Routes consumed by the engine (collaborator: backend API):
///   GET    /conversations
///   GET    /conversations/:id/messages
///   POST   /conversations/:id/messages          body: {"content":"..."}
///   POST   /conversations/:id/messages/media    multipart: content + files
///   POST   /conversations/:id/read
///   POST   /conversations                       body: {"otherUsername":"..."}
///   POST   /conversations/:id/accept
///   DELETE /conversations/:id                   reject / unfriend / leave group
///   POST   /groups                              body: {"groupName","participants"}
///   POST   /groups/:id/add-members
///   PUT    /groups/:id/promote | demote | kick  body: {"memberId":"..."}
///   PUT    /groups/:id/details                  body: {"groupName":"..."}
///   POST   /users/:id/block    DELETE /users/:id/block
///   GET    /users/:id/check-block
///   GET    /users/me/blocked
///   POST   /messages/bulk-delete                body: {"messageIds":[...]}
///   DELETE /messages/:id
///   GET    /users/search?query=...
///
/// The engine never touches HTTP directly; the application supplies an
/// implementation of [`ChatApi`] and maps transport / permission / stale-target
/// failures onto [`SyncError`](crate::error::SyncError) variants.
use crate::blocks::BlockStatus;
use crate::error::Result;
use crate::types::{Conversation, Message, User, UserId};
use async_trait::async_trait;

/// A file staged for a multipart send.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn is_media(&self) -> bool {
        self.mime_type.starts_with("image/") || self.mime_type.starts_with("video/")
    }
}

/// Outcome of `POST /conversations`: 201 means a fresh request went out, 200
/// returns the conversation that already existed between the two users.
#[derive(Debug, Clone)]
pub enum StartChatOutcome {
    RequestSent(Conversation),
    Existing(Conversation),
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_conversations(&self) -> Result<Vec<Conversation>>;
    async fn fetch_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;
    async fn send_message(&self, conversation_id: &str, content: &str) -> Result<Message>;
    async fn send_media_message(
        &self,
        conversation_id: &str,
        content: &str,
        files: &[Attachment],
    ) -> Result<Message>;
    /// Zeroes my unread count server-side and returns the updated conversation.
    async fn mark_read(&self, conversation_id: &str) -> Result<Conversation>;
    async fn start_conversation(&self, other_username: &str) -> Result<StartChatOutcome>;
    async fn accept_conversation(&self, conversation_id: &str) -> Result<Conversation>;
    async fn delete_conversation(&self, conversation_id: &str) -> Result<()>;
    async fn create_group(&self, name: &str, participants: &[UserId]) -> Result<Conversation>;
    async fn add_members(&self, group_id: &str, members: &[UserId]) -> Result<Conversation>;
    async fn promote_member(&self, group_id: &str, member_id: &str) -> Result<Conversation>;
    async fn demote_member(&self, group_id: &str, member_id: &str) -> Result<Conversation>;
    async fn kick_member(&self, group_id: &str, member_id: &str) -> Result<Conversation>;
    async fn update_group_details(&self, group_id: &str, name: &str) -> Result<Conversation>;
    /// Returns the server's confirmation message, surfaced verbatim.
    async fn block_user(&self, user_id: &str) -> Result<String>;
    async fn unblock_user(&self, user_id: &str) -> Result<String>;
    async fn check_block(&self, user_id: &str) -> Result<BlockStatus>;
    async fn blocked_users(&self) -> Result<Vec<UserId>>;
    async fn bulk_delete_messages(&self, message_ids: &[String]) -> Result<()>;
    async fn delete_message(&self, message_id: &str) -> Result<()>;
    async fn search_users(&self, query: &str) -> Result<Vec<User>>;
}
