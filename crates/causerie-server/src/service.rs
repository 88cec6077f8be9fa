//! Conversation orchestration.
//!
//! Every public operation runs under a single caller identity that the
//! external auth layer has already verified.  The service owns the order
//! of effects: authorize, validate, encrypt, persist, then fan out.  The
//! durable save always completes before anything is published, and a
//! publication that reaches nobody is simply dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use causerie_realtime::{PresenceRegistry, RoomBroker};
use causerie_shared::constants::NOTIFICATION_PREVIEW_CHARS;
use causerie_shared::events::{MessagePayload, ServerEvent};
use causerie_shared::types::{Media, Participant, UserIdentity};
use causerie_shared::MessageCipher;
use causerie_store::{Conversation, Database, Message};

use crate::error::ServiceError;
use serde::Serialize;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// One row of a conversation listing, annotated for the calling user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    /// The *other* participant, from the caller's point of view.
    pub participant: Participant,
    /// Decrypted preview of the latest message (or a bracketed media tag).
    pub last_message_preview: String,
    pub last_message_at: chrono::DateTime<Utc>,
    pub unread_count: usize,
    pub created_at: chrono::DateTime<Utc>,
}

/// A full conversation with every message decrypted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: Uuid,
    pub participant_a: Participant,
    pub participant_b: Participant,
    pub messages: Vec<MessagePayload>,
    pub last_message_at: chrono::DateTime<Utc>,
    pub created_at: chrono::DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct ConversationService {
    db: Mutex<Database>,
    cipher: MessageCipher,
    broker: Arc<RoomBroker>,
    presence: Arc<PresenceRegistry>,
}

impl ConversationService {
    pub fn new(
        db: Database,
        cipher: MessageCipher,
        broker: Arc<RoomBroker>,
        presence: Arc<PresenceRegistry>,
    ) -> Self {
        Self {
            db: Mutex::new(db),
            cipher,
            broker,
            presence,
        }
    }

    // The connection itself stays valid across a poisoned lock; recover it.
    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Listing / reading
    // ------------------------------------------------------------------

    /// Conversations the caller participates in and has not soft-deleted,
    /// newest activity first.
    pub fn list_conversations(
        &self,
        caller_id: &str,
    ) -> Result<Vec<ConversationSummary>, ServiceError> {
        let conversations = self.db().list_conversations_for(caller_id)?;

        Ok(conversations
            .into_iter()
            .map(|conversation| ConversationSummary {
                id: conversation.id,
                participant: conversation.other_participant(caller_id).clone(),
                last_message_preview: self
                    .cipher
                    .decrypt_or_plaintext(&conversation.last_message_preview),
                last_message_at: conversation.last_message_at,
                unread_count: conversation.unread_count_for(caller_id),
                created_at: conversation.created_at,
            })
            .collect())
    }

    /// A full conversation, caller must be a participant.
    pub fn get_conversation(
        &self,
        caller_id: &str,
        conversation_id: Uuid,
    ) -> Result<ConversationView, ServiceError> {
        let conversation = self.db().get_conversation(conversation_id)?;
        self.require_participant(&conversation, caller_id)?;
        Ok(self.view(conversation))
    }

    // ------------------------------------------------------------------
    // Creation / restoration
    // ------------------------------------------------------------------

    /// Look up the conversation for the caller/other pair, restoring it for
    /// the caller if they had soft-deleted it; create it when absent.
    ///
    /// This is the only operation that restores a soft-deleted
    /// conversation; sending a message does not.
    pub fn get_or_create(
        &self,
        caller: &UserIdentity,
        other: Participant,
    ) -> Result<ConversationView, ServiceError> {
        if other.user_id.trim().is_empty() || other.display_name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "other participant id and name are required".into(),
            ));
        }

        let db = self.db();
        if let Some(mut conversation) = db.find_conversation_by_pair(&caller.id, &other.user_id)? {
            if conversation.is_deleted_for(&caller.id) {
                conversation.restore_for(&caller.id);
                db.save_conversation(&conversation)?;
                debug!(conversation = %conversation.id, user = %caller.id, "conversation restored");
            }
            return Ok(self.view(conversation));
        }

        let conversation = Conversation::new(caller.to_participant(), other);
        db.create_conversation(&conversation)?;
        info!(conversation = %conversation.id, "conversation created");
        Ok(self.view(conversation))
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Append a message, then fan out: the decrypted message to the
    /// conversation room, and a private notification to the recipient's
    /// user room when they are online.
    pub fn send_message(
        &self,
        caller: &UserIdentity,
        conversation_id: Uuid,
        text: Option<String>,
        media: Option<Media>,
    ) -> Result<MessagePayload, ServiceError> {
        let text = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        match (&text, &media) {
            (None, None) => {
                return Err(ServiceError::Validation(
                    "message text or media is required".into(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(ServiceError::Validation(
                    "message carries either text or media, not both".into(),
                ))
            }
            _ => {}
        }

        let mut conversation = self.db().get_conversation(conversation_id)?;
        self.require_participant(&conversation, &caller.id)?;

        let plaintext = text.unwrap_or_default();
        let ciphertext = self
            .cipher
            .encrypt(&plaintext)
            .map_err(|e| ServiceError::Internal(format!("encryption failed: {e}")))?;

        let now = Utc::now();
        let sender = caller.to_participant();
        let message = Message {
            id: Uuid::new_v4(),
            sender_id: sender.user_id.clone(),
            sender_name: sender.display_name.clone(),
            sender_avatar_url: sender.avatar_url.clone(),
            text: ciphertext.clone(),
            media: media.clone(),
            read: false,
            created_at: now,
            updated_at: None,
        };

        conversation.last_message_preview = match &media {
            Some(m) => m.kind.placeholder().to_string(),
            None => ciphertext,
        };
        conversation.last_message_at = now;
        conversation.messages.push(message.clone());
        self.db().save_conversation(&conversation)?;

        info!(conversation = %conversation_id, message = %message.id, "message stored");

        let payload = MessagePayload {
            text: plaintext.clone(),
            ..self.message_payload(&message)
        };
        self.broker.publish_to_conversation(
            conversation_id,
            ServerEvent::MessageReceived {
                conversation_id,
                message: payload.clone(),
            },
        );

        let recipient = conversation.other_participant(&caller.id);
        if self.presence.is_online(&recipient.user_id) {
            let preview = match &media {
                Some(m) => m.kind.placeholder().to_string(),
                None => plaintext.chars().take(NOTIFICATION_PREVIEW_CHARS).collect(),
            };
            self.broker.publish_to_user(
                &recipient.user_id,
                ServerEvent::NewMessageNotification {
                    conversation_id,
                    sender_id: sender.user_id,
                    sender_name: sender.display_name,
                    message_preview: preview,
                    timestamp: now,
                },
            );
        }

        Ok(payload)
    }

    /// Replace a message's text.  Only its sender may edit it.
    pub fn edit_message(
        &self,
        caller_id: &str,
        conversation_id: Uuid,
        message_id: Uuid,
        new_text: &str,
    ) -> Result<MessagePayload, ServiceError> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return Err(ServiceError::Validation("message text is required".into()));
        }

        let mut conversation = self.db().get_conversation(conversation_id)?;

        let ciphertext = self
            .cipher
            .encrypt(new_text)
            .map_err(|e| ServiceError::Internal(format!("encryption failed: {e}")))?;

        let message = conversation
            .find_message_mut(message_id)
            .ok_or(ServiceError::NotFound("Message"))?;
        if message.sender_id != caller_id {
            return Err(ServiceError::Forbidden("not the message author"));
        }

        message.text = ciphertext;
        message.updated_at = Some(Utc::now());
        let updated = message.clone();
        self.db().save_conversation(&conversation)?;

        self.broker.publish_to_conversation(
            conversation_id,
            ServerEvent::MessageUpdated {
                conversation_id,
                message_id,
                text: new_text.to_string(),
            },
        );

        Ok(MessagePayload {
            text: new_text.to_string(),
            ..self.message_payload(&updated)
        })
    }

    /// Remove a message from the sequence.  Only its sender may do so.
    pub fn delete_message(
        &self,
        caller_id: &str,
        conversation_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), ServiceError> {
        let mut conversation = self.db().get_conversation(conversation_id)?;

        let message = conversation
            .find_message(message_id)
            .ok_or(ServiceError::NotFound("Message"))?;
        if message.sender_id != caller_id {
            return Err(ServiceError::Forbidden("not the message author"));
        }

        conversation.remove_message(message_id);
        self.db().save_conversation(&conversation)?;

        self.broker.publish_to_conversation(
            conversation_id,
            ServerEvent::MessageDeleted {
                conversation_id,
                message_id,
            },
        );

        Ok(())
    }

    /// Mark every message not authored by the caller as read.
    pub fn mark_read(&self, caller_id: &str, conversation_id: Uuid) -> Result<(), ServiceError> {
        let mut conversation = self.db().get_conversation(conversation_id)?;
        conversation.mark_read_for(caller_id);
        self.db().save_conversation(&conversation)?;

        self.broker.publish_to_conversation(
            conversation_id,
            ServerEvent::MessagesRead {
                conversation_id,
                user_id: caller_id.to_string(),
            },
        );

        Ok(())
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Soft-delete for the caller; hard-delete once both participants have
    /// done so.
    pub fn delete_conversation(
        &self,
        caller_id: &str,
        conversation_id: Uuid,
    ) -> Result<(), ServiceError> {
        let mut conversation = self.db().get_conversation(conversation_id)?;
        self.require_participant(&conversation, caller_id)?;

        if conversation.soft_delete_for(caller_id) {
            self.db().delete_conversation(conversation_id)?;
            info!(conversation = %conversation_id, "conversation purged (deleted by both)");
        } else {
            self.db().save_conversation(&conversation)?;
            debug!(conversation = %conversation_id, user = %caller_id, "conversation soft-deleted");
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------

    fn require_participant(
        &self,
        conversation: &Conversation,
        caller_id: &str,
    ) -> Result<(), ServiceError> {
        if conversation.is_participant(caller_id) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("not a conversation participant"))
        }
    }

    /// Decrypted client-facing view of a stored message.
    fn message_payload(&self, message: &Message) -> MessagePayload {
        MessagePayload {
            id: message.id,
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_name.clone(),
            sender_avatar_url: message.sender_avatar_url.clone(),
            text: self.cipher.decrypt_or_plaintext(&message.text),
            media: message.media.clone(),
            read: message.read,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }

    fn view(&self, conversation: Conversation) -> ConversationView {
        ConversationView {
            id: conversation.id,
            participant_a: conversation.participant_a.clone(),
            participant_b: conversation.participant_b.clone(),
            messages: conversation
                .messages
                .iter()
                .map(|m| self.message_payload(m))
                .collect(),
            last_message_at: conversation.last_message_at,
            created_at: conversation.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causerie_realtime::{ConnectionId, Room};
    use causerie_shared::types::MediaKind;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    struct Harness {
        service: ConversationService,
        broker: Arc<RoomBroker>,
        presence: Arc<PresenceRegistry>,
    }

    fn harness() -> Harness {
        let broker = Arc::new(RoomBroker::new());
        let presence = Arc::new(PresenceRegistry::new());
        let service = ConversationService::new(
            Database::open_in_memory().unwrap(),
            MessageCipher::new("test-secret"),
            broker.clone(),
            presence.clone(),
        );
        Harness {
            service,
            broker,
            presence,
        }
    }

    fn user(id: &str, first: &str) -> UserIdentity {
        UserIdentity {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: "Test".to_string(),
            profile_picture_url: String::new(),
        }
    }

    fn other(id: &str, name: &str) -> Participant {
        Participant {
            user_id: id.to_string(),
            display_name: name.to_string(),
            avatar_url: String::new(),
        }
    }

    fn media_attachment() -> Media {
        Media {
            kind: MediaKind::Image,
            url: "https://cdn.example/p.png".into(),
            name: "p.png".into(),
            size_bytes: 512,
        }
    }

    /// Register a live connection and subscribe it to a room.
    fn subscribe(h: &Harness, room: Room) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = unbounded_channel();
        let conn = h.broker.register(tx);
        h.broker.join(room, conn);
        (conn, rx)
    }

    #[test]
    fn test_get_or_create_is_idempotent_and_order_independent() {
        let h = harness();
        let alice = user("alice", "Alice");
        let bob = user("bob", "Bob");

        let first = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();
        let second = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();
        let reversed = h.service.get_or_create(&bob, other("alice", "Alice Test")).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.id, reversed.id);
    }

    #[test]
    fn test_get_or_create_requires_id_and_name() {
        let h = harness();
        let result = h.service.get_or_create(&user("alice", "Alice"), other("", "Bob"));
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn test_send_requires_exactly_text_or_media() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob")).unwrap();

        let neither = h.service.send_message(&alice, conv.id, Some("   ".into()), None);
        assert!(matches!(neither, Err(ServiceError::Validation(_))));

        let both = h.service.send_message(
            &alice,
            conv.id,
            Some("hi".into()),
            Some(media_attachment()),
        );
        assert!(matches!(both, Err(ServiceError::Validation(_))));

        let media_only = h
            .service
            .send_message(&alice, conv.id, None, Some(media_attachment()));
        assert!(media_only.is_ok());
    }

    #[test]
    fn test_message_text_is_encrypted_at_rest_and_decrypted_on_read() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob")).unwrap();

        h.service
            .send_message(&alice, conv.id, Some("hello".into()), None)
            .unwrap();

        // Stored form is a ciphertext token, never the plaintext.
        let stored = h.service.db().get_conversation(conv.id).unwrap();
        assert_ne!(stored.messages[0].text, "hello");
        assert!(stored.messages[0].text.contains(':'));
        assert_eq!(stored.last_message_preview, stored.messages[0].text);

        // Read paths decrypt.
        let view = h.service.get_conversation("bob", conv.id).unwrap();
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].text, "hello");
        assert!(!view.messages[0].read);
    }

    #[test]
    fn test_media_message_preview_is_bracketed_tag() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob")).unwrap();

        h.service
            .send_message(&alice, conv.id, None, Some(media_attachment()))
            .unwrap();

        let listed = h.service.list_conversations("bob").unwrap();
        assert_eq!(listed[0].last_message_preview, "[image]");
    }

    #[test]
    fn test_legacy_plaintext_records_survive_reads() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob")).unwrap();
        h.service
            .send_message(&alice, conv.id, Some("new".into()), None)
            .unwrap();

        // Simulate a record written before encryption was introduced.
        let mut stored = h.service.db().get_conversation(conv.id).unwrap();
        stored.messages[0].text = "plain old text".to_string();
        stored.last_message_preview = "plain old text".to_string();
        h.service.db().save_conversation(&stored).unwrap();

        let view = h.service.get_conversation("alice", conv.id).unwrap();
        assert_eq!(view.messages[0].text, "plain old text");
        let listed = h.service.list_conversations("alice").unwrap();
        assert_eq!(listed[0].last_message_preview, "plain old text");
    }

    #[test]
    fn test_unread_accounting() {
        let h = harness();
        let alice = user("alice", "Alice");
        let bob = user("bob", "Bob");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();

        for text in ["a1", "a2", "a3"] {
            h.service
                .send_message(&alice, conv.id, Some(text.into()), None)
                .unwrap();
        }
        for text in ["b1", "b2"] {
            h.service
                .send_message(&bob, conv.id, Some(text.into()), None)
                .unwrap();
        }

        // Alice's unread count covers only Bob's messages, and vice versa.
        assert_eq!(h.service.list_conversations("alice").unwrap()[0].unread_count, 2);
        assert_eq!(h.service.list_conversations("bob").unwrap()[0].unread_count, 3);
    }

    #[test]
    fn test_full_conversation_scenario() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();

        h.service
            .send_message(&alice, conv.id, Some("hello".into()), None)
            .unwrap();

        let bobs_view = h.service.get_conversation("bob", conv.id).unwrap();
        assert_eq!(bobs_view.messages.len(), 1);
        assert_eq!(bobs_view.messages[0].text, "hello");
        assert!(!bobs_view.messages[0].read);

        h.service.mark_read("bob", conv.id).unwrap();

        let alices_list = h.service.list_conversations("alice").unwrap();
        assert_eq!(alices_list[0].unread_count, 0);
    }

    #[test]
    fn test_authorization_rules() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();
        let sent = h
            .service
            .send_message(&alice, conv.id, Some("mine".into()), None)
            .unwrap();

        // Non-participant cannot read.
        assert!(matches!(
            h.service.get_conversation("mallory", conv.id),
            Err(ServiceError::Forbidden(_))
        ));

        // Non-sender (even a participant) cannot edit or delete.
        assert!(matches!(
            h.service.edit_message("bob", conv.id, sent.id, "hacked"),
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            h.service.delete_message("bob", conv.id, sent.id),
            Err(ServiceError::Forbidden(_))
        ));

        // Unknown ids are NotFound, not Forbidden.
        assert!(matches!(
            h.service.get_conversation("alice", Uuid::new_v4()),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            h.service.delete_message("alice", conv.id, Uuid::new_v4()),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_edit_message_reencrypts_and_stamps() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob")).unwrap();
        let sent = h
            .service
            .send_message(&alice, conv.id, Some("first".into()), None)
            .unwrap();

        let empty = h.service.edit_message("alice", conv.id, sent.id, "  ");
        assert!(matches!(empty, Err(ServiceError::Validation(_))));

        let updated = h
            .service
            .edit_message("alice", conv.id, sent.id, "second")
            .unwrap();
        assert_eq!(updated.text, "second");
        assert!(updated.updated_at.is_some());

        let view = h.service.get_conversation("alice", conv.id).unwrap();
        assert_eq!(view.messages[0].text, "second");
    }

    #[test]
    fn test_delete_message_removes_from_sequence() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob")).unwrap();
        let first = h
            .service
            .send_message(&alice, conv.id, Some("one".into()), None)
            .unwrap();
        h.service
            .send_message(&alice, conv.id, Some("two".into()), None)
            .unwrap();

        h.service.delete_message("alice", conv.id, first.id).unwrap();

        let view = h.service.get_conversation("alice", conv.id).unwrap();
        assert_eq!(view.messages.len(), 1);
        assert_eq!(view.messages[0].text, "two");
    }

    #[test]
    fn test_soft_delete_then_dual_delete_purges() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();
        h.service
            .send_message(&alice, conv.id, Some("hi".into()), None)
            .unwrap();

        h.service.delete_conversation("alice", conv.id).unwrap();
        assert!(h.service.list_conversations("alice").unwrap().is_empty());
        assert_eq!(h.service.list_conversations("bob").unwrap().len(), 1);

        h.service.delete_conversation("bob", conv.id).unwrap();
        assert!(matches!(
            h.service.get_conversation("alice", conv.id),
            Err(ServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_send_does_not_restore_but_get_or_create_does() {
        let h = harness();
        let alice = user("alice", "Alice");
        let bob = user("bob", "Bob");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();

        h.service.delete_conversation("alice", conv.id).unwrap();

        // Bob keeps messaging; the thread stays hidden for Alice.
        h.service
            .send_message(&bob, conv.id, Some("still there?".into()), None)
            .unwrap();
        assert!(h.service.list_conversations("alice").unwrap().is_empty());

        // Only an explicit re-initiation brings it back, same record.
        let restored = h
            .service
            .get_or_create(&alice, other("bob", "Bob Test"))
            .unwrap();
        assert_eq!(restored.id, conv.id);
        assert_eq!(h.service.list_conversations("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_send_fans_out_to_conversation_room() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();
        let (_conn, mut rx) = subscribe(&h, Room::Conversation(conv.id));

        h.service
            .send_message(&alice, conv.id, Some("ping".into()), None)
            .unwrap();

        match rx.try_recv().unwrap() {
            ServerEvent::MessageReceived {
                conversation_id,
                message,
            } => {
                assert_eq!(conversation_id, conv.id);
                assert_eq!(message.text, "ping", "room sees plaintext");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_notification_only_when_recipient_online() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();

        // Bob offline: user room stays quiet even if subscribed.
        let (conn, mut rx) = subscribe(&h, Room::User("bob".into()));
        h.service
            .send_message(&alice, conv.id, Some("first".into()), None)
            .unwrap();
        assert!(rx.try_recv().is_err());

        // Bob online: a private notification arrives, preview truncated.
        h.presence.mark_online("bob", conn);
        let long_text = "x".repeat(80);
        h.service
            .send_message(&alice, conv.id, Some(long_text), None)
            .unwrap();

        match rx.try_recv().unwrap() {
            ServerEvent::NewMessageNotification {
                sender_id,
                message_preview,
                ..
            } => {
                assert_eq!(sender_id, "alice");
                assert_eq!(message_preview.chars().count(), NOTIFICATION_PREVIEW_CHARS);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_mark_read_publishes_update() {
        let h = harness();
        let alice = user("alice", "Alice");
        let conv = h.service.get_or_create(&alice, other("bob", "Bob Test")).unwrap();
        h.service
            .send_message(&alice, conv.id, Some("hi".into()), None)
            .unwrap();
        let (_conn, mut rx) = subscribe(&h, Room::Conversation(conv.id));

        h.service.mark_read("bob", conv.id).unwrap();

        match rx.try_recv().unwrap() {
            ServerEvent::MessagesRead {
                conversation_id,
                user_id,
            } => {
                assert_eq!(conversation_id, conv.id);
                assert_eq!(user_id, "bob");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
