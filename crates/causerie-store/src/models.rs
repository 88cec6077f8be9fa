//! Domain model structs persisted in the conversations database.
//!
//! Message `text` always holds the at-rest form (a ciphertext token, or a
//! legacy plaintext record); decryption happens in the service layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use causerie_shared::types::{Media, Participant};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single message, owned exclusively by its conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique within the owning conversation.
    pub id: Uuid,
    /// Snapshot of the sender's identity at send time.
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar_url: String,
    /// Ciphertext token; empty only when a media attachment is present.
    pub text: String,
    /// Optional media attachment.
    pub media: Option<Media>,
    /// False at creation; flipped only by the non-sender.
    pub read: bool,
    pub created_at: DateTime<Utc>,
    /// Set only on edit.
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A persistent two-party message thread.
///
/// At most one conversation exists per unordered participant pair; the
/// pair is a natural key enforced by the schema's `pair_key` column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: Uuid,
    pub participant_a: Participant,
    pub participant_b: Participant,
    /// Chronological, append-mostly.
    pub messages: Vec<Message>,
    /// Ciphertext or a bracketed media tag, for list views.
    pub last_message_preview: String,
    /// Sort key for conversation listings (descending).
    pub last_message_at: DateTime<Utc>,
    /// User ids who have soft-deleted this conversation.
    pub deleted_for: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a new, empty conversation between two participants.
    pub fn new(participant_a: Participant, participant_b: Participant) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            participant_a,
            participant_b,
            messages: Vec::new(),
            last_message_preview: String::new(),
            last_message_at: now,
            deleted_for: Vec::new(),
            created_at: now,
        }
    }

    /// Canonical key for the unordered participant pair.
    pub fn pair_key(&self) -> String {
        pair_key(&self.participant_a.user_id, &self.participant_b.user_id)
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participant_a.user_id == user_id || self.participant_b.user_id == user_id
    }

    /// The participant that is not `user_id`.  Callers must have verified
    /// membership first.
    pub fn other_participant(&self, user_id: &str) -> &Participant {
        if self.participant_a.user_id == user_id {
            &self.participant_b
        } else {
            &self.participant_a
        }
    }

    /// Messages sent by the other party that `user_id` has not read yet.
    pub fn unread_count_for(&self, user_id: &str) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender_id != user_id && !m.read)
            .count()
    }

    pub fn find_message(&self, message_id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn find_message_mut(&mut self, message_id: Uuid) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// Remove a message from the sequence.  Returns `true` if it existed.
    pub fn remove_message(&mut self, message_id: Uuid) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != message_id);
        self.messages.len() != before
    }

    /// Flip `read` on every message not authored by `user_id`.
    pub fn mark_read_for(&mut self, user_id: &str) {
        for message in &mut self.messages {
            if message.sender_id != user_id {
                message.read = true;
            }
        }
    }

    pub fn is_deleted_for(&self, user_id: &str) -> bool {
        self.deleted_for.iter().any(|id| id == user_id)
    }

    /// Soft-delete for one participant.  Returns `true` when both
    /// participants have now deleted it (terminal state).
    pub fn soft_delete_for(&mut self, user_id: &str) -> bool {
        if !self.is_deleted_for(user_id) {
            self.deleted_for.push(user_id.to_string());
        }
        self.is_deleted_for(&self.participant_a.user_id)
            && self.is_deleted_for(&self.participant_b.user_id)
    }

    /// Undo a soft delete (restore on re-initiation).
    pub fn restore_for(&mut self, user_id: &str) {
        self.deleted_for.retain(|id| id != user_id);
    }
}

/// Canonical `min:max` key for an unordered user-id pair.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}:{b}")
    } else {
        format!("{b}:{a}")
    }
}
