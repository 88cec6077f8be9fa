//! Real-time event surface.
//!
//! Every frame exchanged over a live connection is a tagged envelope of the
//! form `{"event": <name>, "data": {...}}`, with a fixed payload shape per
//! event.  [`ClientEvent`] covers client-to-system frames, [`ServerEvent`]
//! the system-to-client fan-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Media;

/// Decrypted view of a message, as delivered to clients (real-time fan-out
/// and REST responses alike).  The ciphertext never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: Uuid,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar_url: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
}

/// Frames sent by a connected client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Announce the connection's user identity; joins the private user room.
    #[serde(rename = "user:online")]
    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: String },

    #[serde(rename = "conversation:join")]
    #[serde(rename_all = "camelCase")]
    ConversationJoin { conversation_id: Uuid },

    #[serde(rename = "conversation:leave")]
    #[serde(rename_all = "camelCase")]
    ConversationLeave { conversation_id: Uuid },

    #[serde(rename = "typing:start")]
    #[serde(rename_all = "camelCase")]
    TypingStart {
        conversation_id: Uuid,
        user_id: String,
        user_name: String,
    },

    #[serde(rename = "typing:stop")]
    #[serde(rename_all = "camelCase")]
    TypingStop {
        conversation_id: Uuid,
        user_id: String,
        user_name: String,
    },
}

/// Frames fanned out by the system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Broadcast to all other connections when a user comes or goes.
    #[serde(rename = "user:status")]
    #[serde(rename_all = "camelCase")]
    UserStatusChanged { user_id: String, status: UserStatus },

    /// New message, delivered to the conversation room.
    #[serde(rename = "message:receive")]
    #[serde(rename_all = "camelCase")]
    MessageReceived {
        conversation_id: Uuid,
        message: MessagePayload,
    },

    #[serde(rename = "message:updated")]
    #[serde(rename_all = "camelCase")]
    MessageUpdated {
        conversation_id: Uuid,
        message_id: Uuid,
        text: String,
    },

    #[serde(rename = "message:deleted")]
    #[serde(rename_all = "camelCase")]
    MessageDeleted {
        conversation_id: Uuid,
        message_id: Uuid,
    },

    /// Composing indicator, sent to the conversation room excluding the
    /// originating connection.
    #[serde(rename = "typing:update")]
    #[serde(rename_all = "camelCase")]
    TypingUpdate {
        conversation_id: Uuid,
        user_id: String,
        user_name: String,
        is_typing: bool,
    },

    #[serde(rename = "messages:read:update")]
    #[serde(rename_all = "camelCase")]
    MessagesRead {
        conversation_id: Uuid,
        user_id: String,
    },

    /// Private notification, delivered only to the recipient's user room.
    #[serde(rename = "notification:new-message")]
    #[serde(rename_all = "camelCase")]
    NewMessageNotification {
        conversation_id: Uuid,
        sender_id: String,
        sender_name: String,
        message_preview: String,
        timestamp: DateTime<Utc>,
    },
}
