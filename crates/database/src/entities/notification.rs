//! Notification entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    #[serde(skip_serializing)]
    pub id: i64,
    pub public_id: String,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: i64,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DirectMessage,
    GroupInvite,
    GroupMessage,
    FileShared,
    FileShareResponse,
    CodeSession,
    Event,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::DirectMessage => "direct_message",
            NotificationKind::GroupInvite => "group_invite",
            NotificationKind::GroupMessage => "group_message",
            NotificationKind::FileShared => "file_shared",
            NotificationKind::FileShareResponse => "file_share_response",
            NotificationKind::CodeSession => "code_session",
            NotificationKind::Event => "event",
            NotificationKind::System => "system",
        }
    }
}
