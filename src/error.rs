/// Error types for the synchronization engine
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// REST transport failure. Surfaced to the user as a one-line message,
    /// never retried automatically; local state is left unchanged.
    #[error("transport error: {0}")]
    Transport(String),

    /// Server rejected the action (promote/kick/send/...). The server's
    /// message is carried verbatim.
    #[error("{0}")]
    Permission(String),

    /// The acted-on conversation or message no longer exists on the server.
    /// Treated as benign by session flows.
    #[error("stale target: {0}")]
    Stale(String),

    /// Structurally invalid push-event payload. Dropped and logged, never
    /// surfaced to the user.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local pre-send validation failure (attachment rules, send gate).
    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
