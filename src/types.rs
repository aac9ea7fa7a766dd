/// Shared entity types for the sync engine
///
/// Wire field names mirror the backend (`_id`, camelCase). Fields that the
/// backend delivers in more than one shape (raw id string vs. embedded user
/// object, one admin vs. an array) are normalized at ingestion into a single
/// canonical id form so downstream predicates never branch on shape.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub type UserId = String;
pub type ConversationId = String;
pub type MessageId = String;

/// Denormalized user snapshot embedded in conversations and messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// An id-bearing field that the backend sends either as a raw id string or as
/// an embedded object carrying `_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdRef {
    Embedded {
        #[serde(rename = "_id")]
        id: UserId,
    },
    Raw(UserId),
}

impl IdRef {
    pub fn id(&self) -> &str {
        match self {
            IdRef::Embedded { id } => id,
            IdRef::Raw(id) => id,
        }
    }
}

/// `groupAdmin` arrives as a single value or an array depending on server
/// version; both parse to a plain vector.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<IdRef>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(IdRef),
        Many(Vec<IdRef>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(x) => vec![x],
        OneOrMany::Many(xs) => xs,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Pending,
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: ConversationId,
    #[serde(default)]
    pub is_group: bool,
    pub status: ConversationStatus,
    #[serde(default)]
    pub participants: Vec<User>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub group_picture_url: Option<String>,
    /// Immutable creator of a group. Never removable, highest privilege.
    #[serde(default, rename = "groupFounder")]
    pub founder: Option<IdRef>,
    #[serde(default, rename = "groupAdmin", deserialize_with = "one_or_many")]
    pub admins: Vec<IdRef>,
    /// Who sent the original request (direct conversations only).
    #[serde(default, rename = "initiatedBy")]
    pub initiated_by: Option<IdRef>,
    /// Derived: communication gated in either direction.
    #[serde(default)]
    pub has_block: bool,
    #[serde(default)]
    pub unread_counts: HashMap<UserId, u32>,
}

impl Conversation {
    pub fn is_active(&self) -> bool {
        self.status == ConversationStatus::Active
    }

    pub fn founder_id(&self) -> Option<&str> {
        self.founder.as_ref().map(IdRef::id)
    }

    pub fn admin_ids(&self) -> impl Iterator<Item = &str> {
        self.admins.iter().map(IdRef::id)
    }

    pub fn initiated_by_id(&self) -> Option<&str> {
        self.initiated_by.as_ref().map(IdRef::id)
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }

    /// The counterpart in a direct conversation.
    pub fn other_participant(&self, self_id: &str) -> Option<&User> {
        self.participants.iter().find(|p| p.id != self_id)
    }

    pub fn unread_for(&self, user_id: &str) -> u32 {
        self.unread_counts.get(user_id).copied().unwrap_or(0)
    }

    /// A conversation is a pending request requiring my action only if it is a
    /// direct pending conversation that somebody else initiated.
    pub fn is_pending_request_for(&self, self_id: &str) -> bool {
        if self.is_group || self.status != ConversationStatus::Pending {
            return false;
        }
        match self.initiated_by_id() {
            Some(initiator) => initiator != self_id,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Normal,
    System,
    #[serde(other)]
    Other,
}

/// Local lifecycle state of a message. Soft deletion is an explicit tag driven
/// by update events, not a content convention.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MessageState {
    #[default]
    Active,
    Deleted { by: UserId, at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: User,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    /// Text content; may be empty for media-only messages.
    #[serde(default)]
    pub content: String,
    /// Ordered, 0 to 5 entries.
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub state: MessageState,
}

impl Message {
    pub fn is_deleted(&self) -> bool {
        matches!(self.state, MessageState::Deleted { .. })
    }

    pub fn is_system(&self) -> bool {
        self.kind == MessageKind::System
    }
}

/// Profile fields patched into every denormalized user snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub user_id: UserId,
    pub username: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

impl ProfilePatch {
    /// Structural patch: overwrite the mutable profile fields, keep identity.
    pub fn apply_to(&self, user: &mut User) {
        if user.id != self.user_id {
            return;
        }
        user.username = self.username.clone();
        user.bio = self.bio.clone();
        user.profile_picture_url = self.profile_picture_url.clone();
    }
}
