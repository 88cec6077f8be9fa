//! Room-based publish/subscribe for live connections.
//!
//! Each connection registers an unbounded sender; rooms are sets of
//! connection ids.  Delivery is best-effort and at-most-once: a member
//! whose receiver has gone away is skipped, nothing is queued or replayed.
//! Publishing never blocks and never fails the caller.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use causerie_shared::events::ServerEvent;

/// Opaque identifier for one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A broadcast group.
///
/// Conversation rooms are joined on explicit subscribe; the user room is
/// joined exactly once when a connection announces its identity, enabling
/// private delivery independent of which conversations are open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    Conversation(Uuid),
    User(String),
}

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

#[derive(Debug, Default)]
struct BrokerState {
    connections: HashMap<ConnectionId, EventSender>,
    rooms: HashMap<Room, HashSet<ConnectionId>>,
}

/// Room-based broker, local to one running process.
#[derive(Debug, Default)]
pub struct RoomBroker {
    state: RwLock<BrokerState>,
}

impl RoomBroker {
    pub fn new() -> Self {
        Self::default()
    }

    // Recover the guard on poison; the maps stay usable.
    fn read(&self) -> RwLockReadGuard<'_, BrokerState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BrokerState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new connection and hand back its id.
    pub fn register(&self, sender: EventSender) -> ConnectionId {
        let id = ConnectionId::new();
        self.write().connections.insert(id, sender);
        debug!(connection = %id, "connection registered");
        id
    }

    /// Remove a connection from every room and drop its sender.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        let mut state = self.write();
        state.connections.remove(&connection_id);
        for members in state.rooms.values_mut() {
            members.remove(&connection_id);
        }
        state.rooms.retain(|_, members| !members.is_empty());
        debug!(connection = %connection_id, "connection removed");
    }

    pub fn join(&self, room: Room, connection_id: ConnectionId) {
        let mut state = self.write();
        if !state.connections.contains_key(&connection_id) {
            debug!(connection = %connection_id, ?room, "join from unknown connection ignored");
            return;
        }
        state.rooms.entry(room).or_default().insert(connection_id);
    }

    pub fn leave(&self, room: &Room, connection_id: ConnectionId) {
        let mut state = self.write();
        if let Some(members) = state.rooms.get_mut(room) {
            members.remove(&connection_id);
            if members.is_empty() {
                state.rooms.remove(room);
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }

    // ------------------------------------------------------------------
    // Publish
    // ------------------------------------------------------------------

    /// Deliver an event to every member of a conversation room.
    pub fn publish_to_conversation(&self, conversation_id: Uuid, event: ServerEvent) {
        self.publish_to_room(&Room::Conversation(conversation_id), None, event);
    }

    /// Deliver an event to a conversation room, excluding the originating
    /// connection (typing indicators).
    pub fn publish_to_conversation_except(
        &self,
        conversation_id: Uuid,
        except: ConnectionId,
        event: ServerEvent,
    ) {
        self.publish_to_room(&Room::Conversation(conversation_id), Some(except), event);
    }

    /// Deliver an event to a user's private room.
    pub fn publish_to_user(&self, user_id: &str, event: ServerEvent) {
        self.publish_to_room(&Room::User(user_id.to_string()), None, event);
    }

    /// Deliver an event to every registered connection except the origin
    /// (presence side-channel).
    pub fn broadcast_except(&self, except: ConnectionId, event: ServerEvent) {
        let state = self.read();
        for (id, sender) in &state.connections {
            if *id == except {
                continue;
            }
            deliver(*id, sender, event.clone());
        }
    }

    fn publish_to_room(&self, room: &Room, except: Option<ConnectionId>, event: ServerEvent) {
        let state = self.read();
        let Some(members) = state.rooms.get(room) else {
            trace!(?room, "publish to empty room dropped");
            return;
        };
        for id in members {
            if Some(*id) == except {
                continue;
            }
            if let Some(sender) = state.connections.get(id) {
                deliver(*id, sender, event.clone());
            }
        }
    }
}

fn deliver(id: ConnectionId, sender: &EventSender, event: ServerEvent) {
    if sender.send(event).is_err() {
        // Receiver already gone; the event is simply dropped.
        debug!(connection = %id, "delivery to closed connection skipped");
    }
}
