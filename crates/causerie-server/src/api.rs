//! HTTP surface.
//!
//! Thin axum handlers over [`ConversationService`]; every route resolves
//! the caller identity from trusted gateway headers before touching the
//! service.  Error mapping to status codes lives on [`ServiceError`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use causerie_realtime::{PresenceRegistry, RoomBroker};
use causerie_shared::constants::DEFAULT_AVATAR_URL;
use causerie_shared::events::MessagePayload;
use causerie_shared::types::{Media, Participant, UserIdentity};

use crate::error::ServiceError;
use crate::service::{ConversationService, ConversationSummary, ConversationView};
use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConversationService>,
    pub broker: Arc<RoomBroker>,
    pub presence: Arc<PresenceRegistry>,
}

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

/// Identity headers set by the authenticating gateway in front of this
/// server.  `x-user-id` is mandatory; the name and avatar headers enrich
/// the stored participant snapshot when present.
pub struct AuthUser(pub UserIdentity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        let id = header("x-user-id")
            .filter(|id| !id.trim().is_empty())
            .ok_or(ServiceError::Unauthorized)?;

        Ok(AuthUser(UserIdentity {
            id,
            first_name: header("x-user-first-name").unwrap_or_default(),
            last_name: header("x-user-last-name").unwrap_or_default(),
            profile_picture_url: header("x-user-avatar").unwrap_or_default(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    pub text: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/conversations/{id}",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/conversations/{id}/messages", post(send_message))
        .route(
            "/conversations/{id}/messages/{message_id}",
            put(edit_message).delete(delete_message),
        )
        .route("/conversations/{id}/read", patch(mark_read))
        .route("/ws", get(ws::upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and run the HTTP server until it fails or the task is dropped.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http server listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<ConversationSummary>>, ServiceError> {
    Ok(Json(state.service.list_conversations(&caller.id)?))
}

async fn create_conversation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreateConversationRequest>,
) -> Result<Json<ConversationView>, ServiceError> {
    let other = Participant {
        user_id: body.user_id,
        display_name: body.user_name,
        avatar_url: body
            .user_avatar
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string()),
    };
    Ok(Json(state.service.get_or_create(&caller, other)?))
}

async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationView>, ServiceError> {
    Ok(Json(state.service.get_conversation(&caller.id, id)?))
}

async fn delete_conversation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.service.delete_conversation(&caller.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_message(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessagePayload>), ServiceError> {
    let message = state
        .service
        .send_message(&caller, id, body.text, body.media)?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn edit_message(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<EditMessageRequest>,
) -> Result<Json<MessagePayload>, ServiceError> {
    Ok(Json(state.service.edit_message(
        &caller.id, id, message_id, &body.text,
    )?))
}

async fn delete_message(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path((id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServiceError> {
    state.service.delete_message(&caller.id, id, message_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_read(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.service.mark_read(&caller.id, id)?;
    Ok(StatusCode::NO_CONTENT)
}
