//! Vault file and share entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// File metadata. The blob itself lives in external storage behind `file_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ZoroFile {
    pub id: i64,
    pub public_id: String,
    pub owner_id: i64,
    pub owner_public_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub file_url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewZoroFile {
    pub owner_id: i64,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub file_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SharedFile {
    pub id: i64,
    pub public_id: String,
    pub file_id: i64,
    pub file_public_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub file_url: String,
    pub sender_id: i64,
    pub sender_public_id: String,
    pub recipient_id: i64,
    pub recipient_public_id: String,
    pub status: ShareStatus,
    pub note: Option<String>,
    pub created_at: String,
    pub responded_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShare {
    pub file_id: i64,
    pub sender_id: i64,
    pub recipient_id: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
    Pending,
    Accepted,
    Declined,
}

impl ShareStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareStatus::Pending => "pending",
            ShareStatus::Accepted => "accepted",
            ShareStatus::Declined => "declined",
        }
    }
}
