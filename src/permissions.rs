/// Group membership facts and the action set each role may perform
///
/// Pure functions over a conversation snapshot. These gate which actions the
/// UI offers; the server re-validates and stays the final authority.
use crate::types::Conversation;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Founder,
    Admin,
    Member,
}

pub fn is_founder(conv: &Conversation, user_id: &str) -> bool {
    conv.founder_id() == Some(user_id)
}

/// Membership in the explicit admin set. The founder implicitly has admin
/// powers but that capability is tracked separately from this fact.
pub fn is_admin(conv: &Conversation, user_id: &str) -> bool {
    conv.admin_ids().any(|id| id == user_id)
}

fn has_admin_powers(conv: &Conversation, user_id: &str) -> bool {
    is_admin(conv, user_id) || is_founder(conv, user_id)
}

pub fn role_of(conv: &Conversation, user_id: &str) -> MemberRole {
    if is_founder(conv, user_id) {
        MemberRole::Founder
    } else if is_admin(conv, user_id) {
        MemberRole::Admin
    } else {
        MemberRole::Member
    }
}

/// Admins may promote plain members; nobody promotes an admin or the founder.
pub fn can_promote(conv: &Conversation, actor: &str, target: &str) -> bool {
    actor != target
        && has_admin_powers(conv, actor)
        && !is_admin(conv, target)
        && !is_founder(conv, target)
}

/// Only the founder demotes, and only admins that are not the founder.
pub fn can_demote(conv: &Conversation, actor: &str, target: &str) -> bool {
    is_founder(conv, actor) && is_admin(conv, target) && !is_founder(conv, target)
}

/// Admins kick plain members; the founder also kicks admins. The founder can
/// never be kicked.
pub fn can_kick(conv: &Conversation, actor: &str, target: &str) -> bool {
    if actor == target || is_founder(conv, target) {
        return false;
    }
    if is_founder(conv, actor) {
        return true;
    }
    has_admin_powers(conv, actor) && !is_admin(conv, target)
}

/// Flags for the member row shown in the group member list.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MemberActions {
    pub role: MemberRole,
    pub can_promote: bool,
    pub can_demote: bool,
    pub can_kick: bool,
}

pub fn actions_for(conv: &Conversation, actor: &str, target: &str) -> MemberActions {
    MemberActions {
        role: role_of(conv, target),
        can_promote: can_promote(conv, actor, target),
        can_demote: can_demote(conv, actor, target),
        can_kick: can_kick(conv, actor, target),
    }
}
