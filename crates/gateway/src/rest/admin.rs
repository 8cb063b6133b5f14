//! Site administration. Role checks live in the chat services; the
//! suggestion cache endpoint checks here since it has no service of its own.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use zoro_chats::{AdminStats, CreateEventRequest, SettingView};
use zoro_database::{Event, UpdateEvent, User, UserRole};

use crate::error::ErrorResponse;
use crate::extract::CurrentUser;
use crate::rest::auth::SuccessResponse;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    /// `user` or `admin`.
    #[schema(value_type = String)]
    pub role: UserRole,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PutSettingRequest {
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CacheClearedResponse {
    pub success: bool,
    pub cleared: u64,
}

pub fn create_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/:user_id", delete(delete_user))
        .route("/api/admin/users/:user_id/role", put(set_role))
        .route("/api/admin/settings", get(list_settings))
        .route(
            "/api/admin/settings/:key",
            put(put_setting).delete(delete_setting),
        )
        .route("/api/admin/events", get(list_events).post(create_event))
        .route(
            "/api/admin/events/:event_id",
            put(update_event).delete(delete_event),
        )
        .route("/api/admin/suggestions/cache", delete(clear_suggestion_cache))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "Admin",
    responses(
        (status = 200, description = "Row counts per entity"),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn stats(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.services().admin.stats(&user).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users matching the search"),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state
        .services()
        .admin
        .list_users(&user, query.search.as_deref(), query.limit, query.offset)
        .await?;
    Ok(Json(users))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{user_id}/role",
    tag = "Admin",
    params(("user_id" = String, Path, description = "Public id of the user")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "User with the new role"),
        (status = 400, description = "Admins cannot demote themselves", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_role(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(user_id): Path<String>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<User>, ApiError> {
    let updated = state
        .services()
        .admin
        .set_role(&user, &user_id, payload.role)
        .await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{user_id}",
    tag = "Admin",
    params(("user_id" = String, Path, description = "Public id of the user")),
    responses(
        (status = 200, description = "User and their data deleted", body = SuccessResponse),
        (status = 400, description = "Admins cannot delete themselves", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.services().admin.delete_user(&user, &user_id).await?;
    Ok(SuccessResponse::ok())
}

#[utoipa::path(
    get,
    path = "/api/admin/settings",
    tag = "Admin",
    responses(
        (status = 200, description = "All settings"),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_settings(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<Vec<SettingView>>, ApiError> {
    Ok(Json(state.services().admin.settings(&user).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/settings/{key}",
    tag = "Admin",
    params(("key" = String, Path, description = "Setting key")),
    request_body = PutSettingRequest,
    responses(
        (status = 200, description = "Stored setting"),
        (status = 400, description = "Invalid key", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn put_setting(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(key): Path<String>,
    Json(payload): Json<PutSettingRequest>,
) -> Result<Json<SettingView>, ApiError> {
    let setting = state
        .services()
        .admin
        .put_setting(&user, &key, payload.value)
        .await?;
    Ok(Json(setting))
}

#[utoipa::path(
    delete,
    path = "/api/admin/settings/{key}",
    tag = "Admin",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting removed", body = SuccessResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_setting(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(key): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.services().admin.delete_setting(&user, &key).await?;
    Ok(SuccessResponse::ok())
}

#[utoipa::path(
    get,
    path = "/api/admin/events",
    tag = "Admin",
    responses((status = 200, description = "Every event, past and upcoming")),
    security(("bearerAuth" = []))
)]
pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<Vec<Event>>, ApiError> {
    require_admin(&user)?;
    Ok(Json(state.services().events.all().await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/events",
    tag = "Admin",
    responses(
        (status = 201, description = "Event created"),
        (status = 400, description = "Invalid title or timestamps", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(payload): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state.services().events.create(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[utoipa::path(
    put,
    path = "/api/admin/events/{event_id}",
    tag = "Admin",
    params(("event_id" = String, Path, description = "Public id of the event")),
    responses(
        (status = 200, description = "Updated event"),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(event_id): Path<String>,
    Json(payload): Json<UpdateEvent>,
) -> Result<Json<Event>, ApiError> {
    let event = state
        .services()
        .events
        .update(&user, &event_id, payload)
        .await?;
    Ok(Json(event))
}

#[utoipa::path(
    delete,
    path = "/api/admin/events/{event_id}",
    tag = "Admin",
    params(("event_id" = String, Path, description = "Public id of the event")),
    responses(
        (status = 200, description = "Event deleted", body = SuccessResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_event(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(event_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.services().events.delete(&user, &event_id).await?;
    Ok(SuccessResponse::ok())
}

#[utoipa::path(
    delete,
    path = "/api/admin/suggestions/cache",
    tag = "Admin",
    responses(
        (status = 200, description = "Cached suggestion pools removed", body = CacheClearedResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn clear_suggestion_cache(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<CacheClearedResponse>, ApiError> {
    require_admin(&user)?;
    let cleared = state.suggestions().clear_cache().await;
    info!(cleared, by = %user.public_id, "suggestion cache cleared");
    Ok(Json(CacheClearedResponse {
        success: true,
        cleared,
    }))
}

fn require_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("admin role required"))
    }
}
