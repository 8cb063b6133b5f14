//! Zoro vault: file metadata and person-to-person sharing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use zoro_chats::{FileView, RegisterFileRequest, ShareFileRequest, ShareView};
use zoro_database::ShareStatus;

use crate::error::ErrorResponse;
use crate::extract::CurrentUser;
use crate::rest::auth::SuccessResponse;
use crate::websocket::chat::push_notification;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct IncomingSharesQuery {
    /// `pending`, `accepted` or `declined`.
    #[param(value_type = Option<String>)]
    pub status: Option<ShareStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RespondToShareRequest {
    pub accept: bool,
}

pub fn create_vault_routes() -> Router<AppState> {
    Router::new()
        .route("/api/zoro/files", get(list_files).post(register_file))
        .route("/api/zoro/files/:file_id", delete(delete_file))
        .route("/api/zoro/files/:file_id/share", post(share_file))
        .route("/api/zoro/shares/incoming", get(incoming_shares))
        .route("/api/zoro/shares/outgoing", get(outgoing_shares))
        .route("/api/zoro/shares/:share_id/respond", post(respond_to_share))
}

#[utoipa::path(
    get,
    path = "/api/zoro/files",
    tag = "Vault",
    responses((status = 200, description = "Owned files and files received through accepted shares")),
    security(("bearerAuth" = []))
)]
pub async fn list_files(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<Vec<FileView>>, ApiError> {
    Ok(Json(state.services().vault.list_files(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/zoro/files",
    tag = "Vault",
    responses(
        (status = 201, description = "File registered"),
        (status = 400, description = "Invalid name, size or url", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn register_file(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(payload): Json<RegisterFileRequest>,
) -> Result<(StatusCode, Json<FileView>), ApiError> {
    let file = state.services().vault.register_file(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

#[utoipa::path(
    delete,
    path = "/api/zoro/files/{file_id}",
    tag = "Vault",
    params(("file_id" = String, Path, description = "Public id of the file")),
    responses(
        (status = 200, description = "File deleted", body = SuccessResponse),
        (status = 403, description = "Only the owner may delete", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_file(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(file_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.services().vault.delete_file(&user, &file_id).await?;
    Ok(SuccessResponse::ok())
}

#[utoipa::path(
    post,
    path = "/api/zoro/files/{file_id}/share",
    tag = "Vault",
    params(("file_id" = String, Path, description = "Public id of the file")),
    responses(
        (status = 201, description = "Share created and recipient notified"),
        (status = 400, description = "Sharing with yourself", body = ErrorResponse),
        (status = 409, description = "A pending share already exists", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn share_file(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(file_id): Path<String>,
    Json(payload): Json<ShareFileRequest>,
) -> Result<(StatusCode, Json<ShareView>), ApiError> {
    let share = state
        .services()
        .vault
        .share_file(&user, &file_id, payload)
        .await?;
    push_notification(
        &state,
        &share.recipient_id,
        format!("{} shared {} with you", user.label(), share.file_name),
        Some(format!("/zoro/shares/{}", share.id)),
    )
    .await;
    Ok((StatusCode::CREATED, Json(share)))
}

#[utoipa::path(
    get,
    path = "/api/zoro/shares/incoming",
    tag = "Vault",
    params(IncomingSharesQuery),
    responses((status = 200, description = "Shares addressed to the caller")),
    security(("bearerAuth" = []))
)]
pub async fn incoming_shares(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Query(query): Query<IncomingSharesQuery>,
) -> Result<Json<Vec<ShareView>>, ApiError> {
    let shares = state
        .services()
        .vault
        .incoming_shares(&user, query.status)
        .await?;
    Ok(Json(shares))
}

#[utoipa::path(
    get,
    path = "/api/zoro/shares/outgoing",
    tag = "Vault",
    responses((status = 200, description = "Shares the caller has sent")),
    security(("bearerAuth" = []))
)]
pub async fn outgoing_shares(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<Vec<ShareView>>, ApiError> {
    Ok(Json(state.services().vault.outgoing_shares(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/zoro/shares/{share_id}/respond",
    tag = "Vault",
    params(("share_id" = String, Path, description = "Public id of the share")),
    request_body = RespondToShareRequest,
    responses(
        (status = 200, description = "Share accepted or declined"),
        (status = 403, description = "Only the recipient may respond", body = ErrorResponse),
        (status = 409, description = "Share is no longer pending", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn respond_to_share(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(share_id): Path<String>,
    Json(payload): Json<RespondToShareRequest>,
) -> Result<Json<ShareView>, ApiError> {
    let share = state
        .services()
        .vault
        .respond_to_share(&user, &share_id, payload.accept)
        .await?;
    push_notification(
        &state,
        &share.sender_id,
        format!(
            "{} {} {}",
            user.label(),
            share.status.as_str(),
            share.file_name
        ),
        Some(format!("/zoro/shares/{}", share.id)),
    )
    .await;
    Ok(Json(share))
}
