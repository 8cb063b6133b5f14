//! Request payloads accepted by the chat services.

use serde::{Deserialize, Serialize};
use zoro_database::MessageType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendDirectMessage {
    /// Public id of the recipient.
    pub recipient_id: String,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Public ids of the initial members besides the creator.
    #[serde(default)]
    pub member_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendGroupMessage {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFileRequest {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub file_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareFileRequest {
    pub recipient_id: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCodeSessionRequest {
    pub title: String,
    #[serde(default = "CreateCodeSessionRequest::default_language")]
    pub language: String,
    #[serde(default)]
    pub content: String,
}

impl CreateCodeSessionRequest {
    fn default_language() -> String {
        "plaintext".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// RFC 3339 timestamp.
    pub starts_at: String,
    #[serde(default)]
    pub ends_at: Option<String>,
}

/// Cursor-style paging for message history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    /// Public id of the oldest message already loaded.
    #[serde(default)]
    pub before: Option<String>,
}
