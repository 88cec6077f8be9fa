//! # causerie-realtime
//!
//! In-process real-time layer: a presence registry mapping users to live
//! connections, and a room-based broker that fans events out to connected
//! sessions.  Both are plain injectable objects constructed once at process
//! start; there is no cross-instance coordination.

pub mod broker;
pub mod presence;

pub use broker::{ConnectionId, Room, RoomBroker};
pub use presence::PresenceRegistry;
