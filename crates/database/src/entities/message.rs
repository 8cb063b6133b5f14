//! Direct message entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A one-to-one message. `content` is stored as written by the caller,
/// which encrypts it before it reaches the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DirectMessage {
    pub id: i64,
    pub public_id: String,
    pub sender_id: i64,
    pub sender_public_id: String,
    pub recipient_id: i64,
    pub recipient_public_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub read_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDirectMessage {
    pub sender_id: i64,
    pub recipient_id: i64,
    pub content: String,
    pub message_type: MessageType,
}

/// Latest activity with one counterpart, used for the conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ConversationSummary {
    pub partner_id: i64,
    pub partner_public_id: String,
    pub partner_display_name: Option<String>,
    pub partner_email: String,
    pub last_message_id: i64,
    pub last_message_at: String,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    File,
    Code,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::File => "file",
            MessageType::Code => "code",
            MessageType::System => "system",
        }
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        match s {
            "file" => MessageType::File,
            "code" => MessageType::Code,
            "system" => MessageType::System,
            _ => MessageType::Text,
        }
    }
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Text
    }
}
