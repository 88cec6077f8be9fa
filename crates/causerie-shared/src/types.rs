use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_AVATAR_URL;

/// Identity handed to the core by the external auth collaborator.
/// The core never verifies credentials; it consumes this as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub profile_picture_url: String,
}

impl UserIdentity {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Snapshot this identity as a conversation participant.
    pub fn to_participant(&self) -> Participant {
        Participant {
            user_id: self.id.clone(),
            display_name: self.display_name(),
            avatar_url: if self.profile_picture_url.is_empty() {
                DEFAULT_AVATAR_URL.to_string()
            } else {
                self.profile_picture_url.clone()
            },
        }
    }
}

/// Denormalized participant snapshot taken at conversation-creation time.
/// Not live-synced with the user's current profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: String,
}

/// A media attachment carried by a message.  The URL points at
/// already-hosted content and is treated as an opaque string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    /// Bracketed tag used for conversation list previews, e.g. `[image]`.
    pub fn placeholder(&self) -> &'static str {
        match self {
            MediaKind::Image => "[image]",
            MediaKind::Video => "[video]",
            MediaKind::Document => "[document]",
        }
    }
}
