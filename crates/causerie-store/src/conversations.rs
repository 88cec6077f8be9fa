//! CRUD operations for [`Conversation`] records.
//!
//! A conversation is persisted as one `conversations` row plus its embedded
//! `messages` rows.  [`Database::save_conversation`] is an idempotent
//! full-document upsert; callers mutate a loaded [`Conversation`] and save
//! it back.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use causerie_shared::types::{Media, Participant};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{pair_key, Conversation, Message};

const CONVERSATION_COLUMNS: &str = "id, pair_key, \
     a_user_id, a_display_name, a_avatar_url, \
     b_user_id, b_display_name, b_avatar_url, \
     last_message_preview, last_message_at, deleted_for, created_at";

const MESSAGE_COLUMNS: &str = "id, sender_id, sender_name, sender_avatar_url, \
     text, media, read, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new conversation.  Fails if the participant pair already
    /// has one (the `pair_key` column is unique).
    pub fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        insert_conversation_row(&tx, conversation, false)?;
        insert_messages(&tx, conversation)?;
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single conversation (with all its messages) by UUID.
    pub fn get_conversation(&self, id: Uuid) -> Result<Conversation> {
        let mut conversation = self
            .conn()
            .query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id.to_string()],
                row_to_conversation,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;

        conversation.messages = self.load_messages(id)?;
        Ok(conversation)
    }

    /// Look up the conversation for an unordered participant pair.
    pub fn find_conversation_by_pair(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Conversation>> {
        let found = self
            .conn()
            .query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE pair_key = ?1"),
                params![pair_key(user_a, user_b)],
                row_to_conversation,
            )
            .optional()?;

        match found {
            Some(mut conversation) => {
                conversation.messages = self.load_messages(conversation.id)?;
                Ok(Some(conversation))
            }
            None => Ok(None),
        }
    }

    /// List the conversations a user participates in, newest activity
    /// first, excluding the ones the user has soft-deleted.
    pub fn list_conversations_for(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE a_user_id = ?1 OR b_user_id = ?1
             ORDER BY last_message_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            let mut conversation = row?;
            if conversation.is_deleted_for(user_id) {
                continue;
            }
            conversation.messages = self.load_messages(conversation.id)?;
            conversations.push(conversation);
        }
        Ok(conversations)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Idempotent full-document upsert.
    ///
    /// The conversation row is replaced and its message rows rewritten in
    /// one transaction, so the stored document always matches the given
    /// value exactly.
    pub fn save_conversation(&self, conversation: &Conversation) -> Result<()> {
        let tx = self.conn().unchecked_transaction()?;
        insert_conversation_row(&tx, conversation, true)?;
        tx.execute(
            "DELETE FROM messages WHERE conversation_id = ?1",
            params![conversation.id.to_string()],
        )?;
        insert_messages(&tx, conversation)?;
        tx.commit()?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Hard-delete a conversation and its messages.  Returns `true` if a
    /// row was deleted.
    pub fn delete_conversation(&self, id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM conversations WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------

    fn load_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?1
             ORDER BY position ASC"
        ))?;

        let rows = stmt.query_map(params![conversation_id.to_string()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn insert_conversation_row(
    conn: &Connection,
    conversation: &Conversation,
    upsert: bool,
) -> Result<()> {
    let conflict_clause = if upsert {
        "ON CONFLICT(id) DO UPDATE SET
             last_message_preview = excluded.last_message_preview,
             last_message_at      = excluded.last_message_at,
             deleted_for          = excluded.deleted_for"
    } else {
        ""
    };

    conn.execute(
        &format!(
            "INSERT INTO conversations ({CONVERSATION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             {conflict_clause}"
        ),
        params![
            conversation.id.to_string(),
            conversation.pair_key(),
            conversation.participant_a.user_id,
            conversation.participant_a.display_name,
            conversation.participant_a.avatar_url,
            conversation.participant_b.user_id,
            conversation.participant_b.display_name,
            conversation.participant_b.avatar_url,
            conversation.last_message_preview,
            conversation.last_message_at.to_rfc3339(),
            serde_json::to_string(&conversation.deleted_for)?,
            conversation.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn insert_messages(conn: &Connection, conversation: &Conversation) -> Result<()> {
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO messages (conversation_id, position, {MESSAGE_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
    ))?;

    for (position, message) in conversation.messages.iter().enumerate() {
        let media_json = message
            .media
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        stmt.execute(params![
            conversation.id.to_string(),
            position as i64,
            message.id.to_string(),
            message.sender_id,
            message.sender_name,
            message.sender_avatar_url,
            message.text,
            media_json,
            message.read,
            message.created_at.to_rfc3339(),
            message.updated_at.map(|t| t.to_rfc3339()),
        ])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Conversation`] (messages loaded separately).
fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| conversion_err(0, e))?;

    let participant_a = Participant {
        user_id: row.get(2)?,
        display_name: row.get(3)?,
        avatar_url: row.get(4)?,
    };
    let participant_b = Participant {
        user_id: row.get(5)?,
        display_name: row.get(6)?,
        avatar_url: row.get(7)?,
    };

    let deleted_for_json: String = row.get(10)?;
    let deleted_for: Vec<String> =
        serde_json::from_str(&deleted_for_json).map_err(|e| conversion_err(10, e))?;

    Ok(Conversation {
        id,
        participant_a,
        participant_b,
        messages: Vec::new(),
        last_message_preview: row.get(8)?,
        last_message_at: parse_timestamp(row.get(9)?, 9)?,
        deleted_for,
        created_at: parse_timestamp(row.get(11)?, 11)?,
    })
}

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let id = Uuid::parse_str(&id_str).map_err(|e| conversion_err(0, e))?;

    let media_json: Option<String> = row.get(5)?;
    let media: Option<Media> = media_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| conversion_err(5, e))?;

    let updated_str: Option<String> = row.get(8)?;
    let updated_at = match updated_str {
        Some(s) => Some(parse_timestamp(s, 8)?),
        None => None,
    };

    Ok(Message {
        id,
        sender_id: row.get(1)?,
        sender_name: row.get(2)?,
        sender_avatar_url: row.get(3)?,
        text: row.get(4)?,
        media,
        read: row.get(6)?,
        created_at: parse_timestamp(row.get(7)?, 7)?,
        updated_at,
    })
}

fn parse_timestamp(s: String, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(column, e))
}

fn conversion_err(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}
