//! v001 -- Initial schema creation.
//!
//! Creates the two core tables: `conversations` and `messages`.  A message
//! row belongs to exactly one conversation and is never addressed outside
//! of it.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id                   TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    pair_key             TEXT NOT NULL UNIQUE,       -- "min_uid:max_uid" of the two participants
    a_user_id            TEXT NOT NULL,
    a_display_name       TEXT NOT NULL,
    a_avatar_url         TEXT NOT NULL,
    b_user_id            TEXT NOT NULL,
    b_display_name       TEXT NOT NULL,
    b_avatar_url         TEXT NOT NULL,
    last_message_preview TEXT NOT NULL DEFAULT '',   -- ciphertext or bracketed media tag
    last_message_at      TEXT NOT NULL,              -- ISO-8601 / RFC-3339, listing sort key
    deleted_for          TEXT NOT NULL DEFAULT '[]', -- JSON array of user ids
    created_at           TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_conversations_a ON conversations(a_user_id);
CREATE INDEX IF NOT EXISTS idx_conversations_b ON conversations(b_user_id);

-- ----------------------------------------------------------------
-- Messages (embedded in their conversation, insertion order = position)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    conversation_id   TEXT NOT NULL,              -- FK -> conversations(id)
    id                TEXT NOT NULL,              -- UUID v4, unique within the conversation
    position          INTEGER NOT NULL,           -- chronological insertion order
    sender_id         TEXT NOT NULL,
    sender_name       TEXT NOT NULL,
    sender_avatar_url TEXT NOT NULL,
    text              TEXT NOT NULL DEFAULT '',   -- ciphertext token, may be empty
    media             TEXT,                       -- JSON, NULL when text-only
    read              INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    created_at        TEXT NOT NULL,
    updated_at        TEXT,

    PRIMARY KEY (conversation_id, id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation_pos
    ON messages(conversation_id, position ASC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
