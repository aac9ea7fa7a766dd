/// Block relationship tracking
///
/// `blocked` holds the users I block, fetched once per session. The reverse
/// direction ("have they blocked me") is only known authoritatively by the
/// server; the `check-block` endpoint reports both directions and is consulted
/// whenever the gate must be recomputed after an unblock.
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct BlockTracker {
    blocked: HashSet<UserId>,
}

impl BlockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set with the session-initial fetch.
    pub fn load(&mut self, user_ids: Vec<UserId>) {
        self.blocked = user_ids.into_iter().collect();
    }

    pub fn block(&mut self, user_id: &str) {
        self.blocked.insert(user_id.to_string());
    }

    pub fn unblock(&mut self, user_id: &str) {
        self.blocked.remove(user_id);
    }

    pub fn has_blocked(&self, user_id: &str) -> bool {
        self.blocked.contains(user_id)
    }
}

/// Authoritative two-direction answer from the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStatus {
    pub i_blocked_them: bool,
    pub they_blocked_me: bool,
}

impl BlockStatus {
    /// Communication is gated when a block exists in either direction.
    pub fn gated(&self) -> bool {
        self.i_blocked_them || self.they_blocked_me
    }
}
