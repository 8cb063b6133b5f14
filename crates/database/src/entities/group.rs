//! Group chat entity definitions

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub member_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub group_id: i64,
    pub user_id: i64,
    pub user_public_id: String,
    pub display_name: Option<String>,
    pub email: String,
    pub role: GroupRole,
    pub joined_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GroupMessage {
    pub id: i64,
    pub public_id: String,
    pub group_id: i64,
    pub sender_id: i64,
    pub sender_public_id: String,
    pub sender_display_name: Option<String>,
    pub content: String,
    pub message_type: crate::entities::MessageType,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub created_by: i64,
    /// Other members; the creator is always added as owner.
    pub member_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroupMessage {
    pub group_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub message_type: crate::entities::MessageType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Owner,
    Admin,
    Member,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Owner => "owner",
            GroupRole::Admin => "admin",
            GroupRole::Member => "member",
        }
    }

    pub fn can_manage_members(&self) -> bool {
        matches!(self, GroupRole::Owner | GroupRole::Admin)
    }
}

impl std::str::FromStr for GroupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(GroupRole::Owner),
            "admin" => Ok(GroupRole::Admin),
            "member" => Ok(GroupRole::Member),
            other => Err(format!("unknown group role '{other}'")),
        }
    }
}
