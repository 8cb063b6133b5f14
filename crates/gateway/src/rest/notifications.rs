use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use zoro_database::Notification;

use crate::error::ErrorResponse;
use crate::extract::CurrentUser;
use crate::rest::auth::SuccessResponse;
use crate::rest::messages::CountResponse;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationsResponse {
    #[schema(value_type = Vec<Object>)]
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdatedResponse {
    pub updated: u64,
}

pub fn create_notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(get_notifications))
        .route("/api/notifications/unread-count", get(get_unread_count))
        .route("/api/notifications/read-all", post(mark_all_read))
        .route("/api/notifications/:notification_id/read", post(mark_notification_read))
        .route("/api/notifications/:notification_id", delete(delete_notification))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    params(ListNotificationsQuery),
    responses((status = 200, description = "Newest notifications first", body = NotificationsResponse)),
    security(("bearerAuth" = []))
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<NotificationsResponse>, ApiError> {
    let service = &state.services().notifications;
    let notifications = service
        .list(user.id, query.unread_only.unwrap_or(false), query.limit)
        .await?;
    let unread_count = service.unread_count(user.id).await?;
    Ok(Json(NotificationsResponse {
        notifications,
        unread_count,
    }))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    responses((status = 200, description = "Unread notifications", body = CountResponse)),
    security(("bearerAuth" = []))
)]
pub async fn get_unread_count(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.services().notifications.unread_count(user.id).await?;
    Ok(Json(CountResponse { count }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{notification_id}/read",
    tag = "Notifications",
    params(("notification_id" = String, Path, description = "Public id of the notification")),
    responses(
        (status = 200, description = "Notification marked read", body = SuccessResponse),
        (status = 404, description = "Not found in the caller's inbox", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .services()
        .notifications
        .mark_read(user.id, &notification_id)
        .await?;
    Ok(SuccessResponse::ok())
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    responses((status = 200, description = "Every unread notification marked read", body = UpdatedResponse)),
    security(("bearerAuth" = []))
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let updated = state.services().notifications.mark_all_read(user.id).await?;
    Ok(Json(UpdatedResponse { updated }))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{notification_id}",
    tag = "Notifications",
    params(("notification_id" = String, Path, description = "Public id of the notification")),
    responses(
        (status = 200, description = "Notification deleted", body = SuccessResponse),
        (status = 404, description = "Not found in the caller's inbox", body = ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .services()
        .notifications
        .delete(user.id, &notification_id)
        .await?;
    Ok(SuccessResponse::ok())
}
