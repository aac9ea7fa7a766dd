/// Session configuration
use serde::{Deserialize, Serialize};

const DEFAULT_MAX_ATTACHMENTS: usize = 5;
const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;

/// Tunables for a single authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of files per message.
    pub max_attachments: usize,

    /// File extensions rejected before upload (lowercase, without dot).
    pub blocked_extensions: Vec<String>,

    /// Capacity of the notification broadcast channel.
    pub notification_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attachments: DEFAULT_MAX_ATTACHMENTS,
            blocked_extensions: vec!["exe".to_string()],
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}
