use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;
use zoro_chats::{ConversationView, HistoryQuery, MessageView, SendDirectMessage};

use crate::error::ErrorResponse;
use crate::extract::CurrentUser;
use crate::rest::auth::SuccessResponse;
use crate::websocket::chat::{deliver_direct, ChatServerEvent};
use crate::{ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct CountResponse {
    pub count: i64,
}

pub fn create_message_routes() -> Router<AppState> {
    Router::new()
        .route("/api/messages", post(send_message))
        .route("/api/messages/conversations", get(list_conversations))
        .route("/api/messages/unread-count", get(unread_count))
        .route("/api/messages/item/:message_id", delete(delete_message))
        .route("/api/messages/:user_id", get(get_conversation))
        .route("/api/messages/:user_id/read", post(mark_read))
}

#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "Messages",
    responses(
        (status = 201, description = "Message stored and delivered"),
        (status = 400, description = "Empty, oversized or self-addressed message", body = ErrorResponse),
        (status = 404, description = "Recipient not found", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(payload): Json<SendDirectMessage>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
    let message = state.services().messages.send_direct(&user, payload).await?;
    deliver_direct(&state, &user, &message).await;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/api/messages/conversations",
    tag = "Messages",
    responses((status = 200, description = "Conversation partners, most recent first")),
    security(("bearerAuth" = []))
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<Vec<ConversationView>>, ApiError> {
    Ok(Json(state.services().messages.conversations(&user).await?))
}

#[utoipa::path(
    get,
    path = "/api/messages/unread-count",
    tag = "Messages",
    responses((status = 200, description = "Unread direct messages", body = CountResponse)),
    security(("bearerAuth" = []))
)]
pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.services().messages.unread_count(&user).await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    get,
    path = "/api/messages/{user_id}",
    tag = "Messages",
    params(
        ("user_id" = String, Path, description = "Public id of the conversation partner"),
        ("limit" = Option<i64>, Query, description = "Page size"),
        ("before" = Option<String>, Query, description = "Return messages older than this message id")
    ),
    responses(
        (status = 200, description = "Messages, oldest first"),
        (status = 404, description = "Partner not found", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(partner_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let messages = state
        .services()
        .messages
        .conversation(&user, &partner_id, &query)
        .await?;
    Ok(Json(messages))
}

#[utoipa::path(
    post,
    path = "/api/messages/{user_id}/read",
    tag = "Messages",
    params(("user_id" = String, Path, description = "Public id of the conversation partner")),
    responses((status = 200, description = "Messages from the partner marked read", body = CountResponse)),
    security(("bearerAuth" = []))
)]
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(partner_id): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let messages = &state.services().messages;
    let marked = messages.mark_read(&user, &partner_id).await?;
    if marked > 0 {
        let partner = messages.find_user(&partner_id).await?;
        let event = ChatServerEvent::MessagesRead {
            reader_id: user.public_id.clone(),
            count: marked,
        };
        state.realtime().chat.send_to_user(partner.id, &event).await;
    }
    Ok(Json(CountResponse {
        count: marked as i64,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/messages/item/{message_id}",
    tag = "Messages",
    params(("message_id" = String, Path, description = "Public id of the message")),
    responses(
        (status = 200, description = "Message deleted", body = SuccessResponse),
        (status = 403, description = "Only the sender may delete", body = ErrorResponse),
        (status = 404, description = "Message not found", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_message(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(message_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .services()
        .messages
        .delete_message(&user, &message_id)
        .await?;
    Ok(SuccessResponse::ok())
}
