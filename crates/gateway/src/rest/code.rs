use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use zoro_chats::{CodeSessionView, CreateCodeSessionRequest};

use crate::error::ErrorResponse;
use crate::extract::CurrentUser;
use crate::rest::auth::SuccessResponse;
use crate::websocket::code::broadcast_update;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCodeRequest {
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
}

pub fn create_code_routes() -> Router<AppState> {
    Router::new()
        .route("/api/code/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/code/sessions/:session_id",
            get(get_session).put(update_session).delete(delete_session),
        )
        .route("/api/code/sessions/:session_id/join", post(join_session))
}

#[utoipa::path(
    get,
    path = "/api/code/sessions",
    tag = "Code",
    responses((status = 200, description = "Sessions the caller participates in")),
    security(("bearerAuth" = []))
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<Vec<CodeSessionView>>, ApiError> {
    Ok(Json(state.services().code_sessions.list(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/code/sessions",
    tag = "Code",
    responses(
        (status = 201, description = "Session created with the caller as owner"),
        (status = 400, description = "Invalid title, language or content", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_session(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(payload): Json<CreateCodeSessionRequest>,
) -> Result<(StatusCode, Json<CodeSessionView>), ApiError> {
    let session = state.services().code_sessions.create(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/api/code/sessions/{session_id}",
    tag = "Code",
    params(("session_id" = String, Path, description = "Public id of the session")),
    responses(
        (status = 200, description = "Session with current content"),
        (status = 403, description = "Caller has not joined the session", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_session(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<CodeSessionView>, ApiError> {
    Ok(Json(state.services().code_sessions.get(&user, &session_id).await?))
}

#[utoipa::path(
    put,
    path = "/api/code/sessions/{session_id}",
    tag = "Code",
    params(("session_id" = String, Path, description = "Public id of the session")),
    request_body = UpdateCodeRequest,
    responses(
        (status = 200, description = "Content saved and pushed to live editors"),
        (status = 403, description = "Caller has not joined the session", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_session(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(session_id): Path<String>,
    Json(payload): Json<UpdateCodeRequest>,
) -> Result<Json<CodeSessionView>, ApiError> {
    let session = state
        .services()
        .code_sessions
        .update_content(&user, &session_id, &payload.content, payload.language.as_deref())
        .await?;
    broadcast_update(&state, &user, &session).await;
    Ok(Json(session))
}

#[utoipa::path(
    delete,
    path = "/api/code/sessions/{session_id}",
    tag = "Code",
    params(("session_id" = String, Path, description = "Public id of the session")),
    responses(
        (status = 200, description = "Session deleted", body = SuccessResponse),
        (status = 403, description = "Only the owner may delete", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_session(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.services().code_sessions.delete(&user, &session_id).await?;
    Ok(SuccessResponse::ok())
}

#[utoipa::path(
    post,
    path = "/api/code/sessions/{session_id}/join",
    tag = "Code",
    params(("session_id" = String, Path, description = "Public id of the session")),
    responses(
        (status = 200, description = "Caller is now a participant"),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn join_session(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(session_id): Path<String>,
) -> Result<Json<CodeSessionView>, ApiError> {
    Ok(Json(state.services().code_sessions.join(&user, &session_id).await?))
}
