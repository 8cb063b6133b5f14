use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use zoro_chats::{
    CreateGroupRequest, GroupDetail, GroupMessageView, GroupView, HistoryQuery, LeaveOutcome,
    MemberView, SendGroupMessage,
};
use zoro_database::GroupRole;

use crate::error::ErrorResponse;
use crate::extract::CurrentUser;
use crate::rest::auth::SuccessResponse;
use crate::websocket::chat::deliver_group;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMembersRequest {
    pub member_ids: Vec<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    /// `admin` or `member`.
    #[schema(value_type = String)]
    pub role: GroupRole,
}

pub fn create_group_routes() -> Router<AppState> {
    Router::new()
        .route("/api/groups", get(list_groups).post(create_group))
        .route("/api/groups/:group_id", get(get_group).delete(delete_group))
        .route(
            "/api/groups/:group_id/members",
            get(list_members).post(add_members),
        )
        .route(
            "/api/groups/:group_id/members/:member_id",
            put(update_member_role).delete(remove_member),
        )
        .route("/api/groups/:group_id/leave", post(leave_group))
        .route(
            "/api/groups/:group_id/messages",
            get(list_messages).post(send_message),
        )
}

#[utoipa::path(
    get,
    path = "/api/groups",
    tag = "Groups",
    responses((status = 200, description = "Groups the caller belongs to")),
    security(("bearerAuth" = []))
)]
pub async fn list_groups(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<Vec<GroupView>>, ApiError> {
    Ok(Json(state.services().groups.list_groups(&user).await?))
}

#[utoipa::path(
    post,
    path = "/api/groups",
    tag = "Groups",
    responses(
        (status = 201, description = "Group created with the caller as owner"),
        (status = 400, description = "Invalid name", body = ErrorResponse),
        (status = 404, description = "A listed member does not exist", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_group(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupDetail>), ApiError> {
    let group = state.services().groups.create_group(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}",
    tag = "Groups",
    params(("group_id" = String, Path, description = "Public id of the group")),
    responses(
        (status = 200, description = "Group with members"),
        (status = 403, description = "Caller is not a member", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_group(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<GroupDetail>, ApiError> {
    Ok(Json(state.services().groups.get_group(&user, &group_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{group_id}",
    tag = "Groups",
    params(("group_id" = String, Path, description = "Public id of the group")),
    responses(
        (status = 200, description = "Group deleted", body = SuccessResponse),
        (status = 403, description = "Only the owner or a site admin may delete", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_group(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.services().groups.delete_group(&user, &group_id).await?;
    Ok(SuccessResponse::ok())
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/members",
    tag = "Groups",
    params(("group_id" = String, Path, description = "Public id of the group")),
    responses((status = 200, description = "Members in join order")),
    security(("bearerAuth" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<MemberView>>, ApiError> {
    Ok(Json(state.services().groups.members(&user, &group_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/members",
    tag = "Groups",
    params(("group_id" = String, Path, description = "Public id of the group")),
    request_body = AddMembersRequest,
    responses(
        (status = 200, description = "Updated member list"),
        (status = 403, description = "Caller cannot manage members", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_members(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(group_id): Path<String>,
    Json(payload): Json<AddMembersRequest>,
) -> Result<Json<Vec<MemberView>>, ApiError> {
    let members = state
        .services()
        .groups
        .add_members(&user, &group_id, &payload.member_ids)
        .await?;
    Ok(Json(members))
}

#[utoipa::path(
    put,
    path = "/api/groups/{group_id}/members/{member_id}",
    tag = "Groups",
    params(
        ("group_id" = String, Path, description = "Public id of the group"),
        ("member_id" = String, Path, description = "Public id of the member")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Member with the new role"),
        (status = 400, description = "Ownership cannot be assigned this way", body = ErrorResponse),
        (status = 403, description = "Caller cannot manage members", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_member_role(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path((group_id, member_id)): Path<(String, String)>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<MemberView>, ApiError> {
    let member = state
        .services()
        .groups
        .update_role(&user, &group_id, &member_id, payload.role)
        .await?;
    Ok(Json(member))
}

#[utoipa::path(
    delete,
    path = "/api/groups/{group_id}/members/{member_id}",
    tag = "Groups",
    params(
        ("group_id" = String, Path, description = "Public id of the group"),
        ("member_id" = String, Path, description = "Public id of the member")
    ),
    responses(
        (status = 200, description = "Member removed", body = SuccessResponse),
        (status = 403, description = "Caller cannot manage members", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path((group_id, member_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .services()
        .groups
        .remove_member(&user, &group_id, &member_id)
        .await?;
    Ok(SuccessResponse::ok())
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/leave",
    tag = "Groups",
    params(("group_id" = String, Path, description = "Public id of the group")),
    responses((status = 200, description = "What happened to the group")),
    security(("bearerAuth" = []))
)]
pub async fn leave_group(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(group_id): Path<String>,
) -> Result<Json<LeaveOutcome>, ApiError> {
    Ok(Json(state.services().groups.leave_group(&user, &group_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/messages",
    tag = "Groups",
    params(
        ("group_id" = String, Path, description = "Public id of the group"),
        ("limit" = Option<i64>, Query, description = "Page size"),
        ("before" = Option<String>, Query, description = "Return messages older than this message id")
    ),
    responses(
        (status = 200, description = "Messages, oldest first"),
        (status = 403, description = "Caller is not a member", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_messages(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(group_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<GroupMessageView>>, ApiError> {
    let messages = state
        .services()
        .groups
        .messages(&user, &group_id, &query)
        .await?;
    Ok(Json(messages))
}

#[utoipa::path(
    post,
    path = "/api/groups/{group_id}/messages",
    tag = "Groups",
    params(("group_id" = String, Path, description = "Public id of the group")),
    responses(
        (status = 201, description = "Message stored and delivered to online members"),
        (status = 403, description = "Caller is not a member", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn send_message(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(group_id): Path<String>,
    Json(payload): Json<SendGroupMessage>,
) -> Result<(StatusCode, Json<GroupMessageView>), ApiError> {
    let message = state
        .services()
        .groups
        .send_message(&user, &group_id, payload)
        .await?;
    deliver_group(&state, &user, &message).await;
    Ok((StatusCode::CREATED, Json(message)))
}
