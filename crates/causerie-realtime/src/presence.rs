//! Online/typing presence tracking.
//!
//! Maintains in-memory maps of which user each live connection belongs to
//! and who is composing in which conversation.  One instance lives for the
//! whole server process and is shared by reference; every operation is a
//! short lock over plain maps, never I/O.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;
use uuid::Uuid;

use crate::broker::ConnectionId;

#[derive(Debug, Default)]
struct PresenceState {
    /// userId -> connectionId.  A user has at most one entry; a reconnect
    /// overwrites the previous one, so only the most recent connection is
    /// reachable through this mapping.
    online: HashMap<String, ConnectionId>,
    /// conversationId -> users currently composing in it.
    typing: HashMap<Uuid, HashSet<String>>,
}

/// Process-wide presence registry.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    state: RwLock<PresenceState>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Recover the guard on poison; the maps stay usable.
    fn read(&self) -> RwLockReadGuard<'_, PresenceState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PresenceState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a user as online on the given connection.
    pub fn mark_online(&self, user_id: &str, connection_id: ConnectionId) {
        let mut state = self.write();
        if let Some(previous) = state.online.insert(user_id.to_string(), connection_id) {
            debug!(user = %user_id, old = %previous, new = %connection_id, "reconnect overwrote presence entry");
        } else {
            debug!(user = %user_id, connection = %connection_id, "user online");
        }
    }

    /// Remove whichever user currently maps to this connection, along with
    /// any typing state they held.  Returns the user id, if any.
    pub fn mark_offline(&self, connection_id: ConnectionId) -> Option<String> {
        let mut state = self.write();

        let user_id = state
            .online
            .iter()
            .find(|(_, conn)| **conn == connection_id)
            .map(|(user, _)| user.clone())?;

        state.online.remove(&user_id);
        for typing in state.typing.values_mut() {
            typing.remove(&user_id);
        }
        state.typing.retain(|_, users| !users.is_empty());

        debug!(user = %user_id, connection = %connection_id, "user offline");
        Some(user_id)
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.read().online.contains_key(user_id)
    }

    pub fn online_count(&self) -> usize {
        self.read().online.len()
    }

    pub fn start_typing(&self, conversation_id: Uuid, user_id: &str) {
        self.write()
            .typing
            .entry(conversation_id)
            .or_default()
            .insert(user_id.to_string());
    }

    pub fn stop_typing(&self, conversation_id: Uuid, user_id: &str) {
        let mut state = self.write();
        if let Some(users) = state.typing.get_mut(&conversation_id) {
            users.remove(user_id);
            if users.is_empty() {
                state.typing.remove(&conversation_id);
            }
        }
    }

    /// Snapshot of the users composing in a conversation.
    pub fn typing_users(&self, conversation_id: Uuid) -> Vec<String> {
        self.read()
            .typing
            .get(&conversation_id)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_online_offline_round_trip() {
        let registry = PresenceRegistry::new();
        let conn = ConnectionId::new();

        assert!(!registry.is_online("alice"));
        registry.mark_online("alice", conn);
        assert!(registry.is_online("alice"));
        assert_eq!(registry.online_count(), 1);

        assert_eq!(registry.mark_offline(conn).as_deref(), Some("alice"));
        assert!(!registry.is_online("alice"));
    }

    #[test]
    fn test_offline_for_unknown_connection_is_none() {
        let registry = PresenceRegistry::new();
        assert_eq!(registry.mark_offline(ConnectionId::new()), None);
    }

    #[test]
    fn test_reconnect_overwrites_entry() {
        let registry = PresenceRegistry::new();
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        registry.mark_online("alice", first);
        registry.mark_online("alice", second);
        assert_eq!(registry.online_count(), 1);

        // The stale connection no longer maps to anyone.
        assert_eq!(registry.mark_offline(first), None);
        assert!(registry.is_online("alice"));
        assert_eq!(registry.mark_offline(second).as_deref(), Some("alice"));
    }

    #[test]
    fn test_typing_set_per_conversation() {
        let registry = PresenceRegistry::new();
        let conv = Uuid::new_v4();

        registry.start_typing(conv, "alice");
        registry.start_typing(conv, "bob");
        registry.start_typing(conv, "alice"); // idempotent

        let mut typing = registry.typing_users(conv);
        typing.sort();
        assert_eq!(typing, vec!["alice", "bob"]);

        registry.stop_typing(conv, "alice");
        assert_eq!(registry.typing_users(conv), vec!["bob"]);
    }

    #[test]
    fn test_disconnect_clears_typing_state() {
        let registry = PresenceRegistry::new();
        let conn = ConnectionId::new();
        let conv = Uuid::new_v4();

        registry.mark_online("alice", conn);
        registry.start_typing(conv, "alice");

        registry.mark_offline(conn);
        assert!(registry.typing_users(conv).is_empty());
    }
}
