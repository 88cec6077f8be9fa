//! WebSocket sessions.
//!
//! Each socket registers an unbounded sender with the broker, spawns a
//! writer task that serializes [`ServerEvent`]s into text frames, and
//! drives presence from the inbound [`ClientEvent`] stream.  Teardown is
//! symmetric: the presence entry, room memberships and sender all go away
//! together when the socket closes.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use causerie_realtime::{ConnectionId, PresenceRegistry, Room, RoomBroker};
use causerie_shared::events::{ClientEvent, ServerEvent, UserStatus};

use crate::api::AppState;

pub async fn upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| session(socket, state))
}

async fn session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();
    let connection_id = state.broker.register(tx);

    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "unserializable event dropped");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // User id this connection has announced, set at most once.
    let mut announced: Option<String> = None;

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(connection = %connection_id, error = %e, "socket read failed");
                break;
            }
        };
        let text = match frame {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            // Ping/pong handled by axum; binary frames are not part of
            // the protocol.
            _ => continue,
        };
        match serde_json::from_str::<ClientEvent>(&text) {
            Ok(event) => handle_client_event(
                &state.broker,
                &state.presence,
                connection_id,
                &mut announced,
                event,
            ),
            Err(e) => {
                debug!(connection = %connection_id, error = %e, "unparseable frame ignored");
            }
        }
    }

    writer.abort();
    if let Some(user_id) = state.presence.mark_offline(connection_id) {
        state.broker.broadcast_except(
            connection_id,
            ServerEvent::UserStatusChanged {
                user_id,
                status: UserStatus::Offline,
            },
        );
    }
    state.broker.disconnect(connection_id);
}

fn handle_client_event(
    broker: &RoomBroker,
    presence: &PresenceRegistry,
    connection_id: ConnectionId,
    announced: &mut Option<String>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::UserOnline { user_id } => {
            if announced.is_some() {
                debug!(connection = %connection_id, "duplicate online announce ignored");
                return;
            }
            *announced = Some(user_id.clone());
            presence.mark_online(&user_id, connection_id);
            broker.join(Room::User(user_id.clone()), connection_id);
            broker.broadcast_except(
                connection_id,
                ServerEvent::UserStatusChanged {
                    user_id,
                    status: UserStatus::Online,
                },
            );
        }
        ClientEvent::ConversationJoin { conversation_id } => {
            broker.join(Room::Conversation(conversation_id), connection_id);
        }
        ClientEvent::ConversationLeave { conversation_id } => {
            broker.leave(&Room::Conversation(conversation_id), connection_id);
        }
        ClientEvent::TypingStart {
            conversation_id,
            user_id,
            user_name,
        } => {
            presence.start_typing(conversation_id, &user_id);
            broker.publish_to_conversation_except(
                conversation_id,
                connection_id,
                ServerEvent::TypingUpdate {
                    conversation_id,
                    user_id,
                    user_name,
                    is_typing: true,
                },
            );
        }
        ClientEvent::TypingStop {
            conversation_id,
            user_id,
            user_name,
        } => {
            presence.stop_typing(conversation_id, &user_id);
            broker.publish_to_conversation_except(
                conversation_id,
                connection_id,
                ServerEvent::TypingUpdate {
                    conversation_id,
                    user_id,
                    user_name,
                    is_typing: false,
                },
            );
        }
    }
}
