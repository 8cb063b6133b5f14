//! Response views. Internal row ids never leave the crate; every id here is
//! a public id and message bodies are already decrypted.

use serde::{Deserialize, Serialize};
use zoro_database::{
    CodeSession, Group, GroupMember, GroupRole, MessageType, Setting, ShareStatus, SharedFile,
    User, ZoroFile,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.public_id.clone(),
            email: user.email.clone(),
            display_name: user.label(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub read_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationView {
    pub partner: ConversationPartner,
    pub last_message: Option<MessageView>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationPartner {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub member_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Group> for GroupView {
    fn from(group: Group) -> Self {
        Self {
            id: group.public_id,
            name: group.name,
            description: group.description,
            member_count: group.member_count,
            created_at: group.created_at,
            updated_at: group.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberView {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub role: GroupRole,
    pub joined_at: String,
}

impl From<GroupMember> for MemberView {
    fn from(member: GroupMember) -> Self {
        Self {
            user_id: member.user_public_id,
            email: member.email,
            display_name: member.display_name,
            role: member.role,
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: GroupView,
    pub role: GroupRole,
    pub members: Vec<MemberView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMessageView {
    pub id: String,
    pub group_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: String,
}

/// What happened to the group after a member left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LeaveOutcome {
    Left { new_owner: Option<String> },
    GroupDeleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileView {
    pub id: String,
    pub owner_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub file_url: String,
    pub created_at: String,
}

impl From<ZoroFile> for FileView {
    fn from(file: ZoroFile) -> Self {
        Self {
            id: file.public_id,
            owner_id: file.owner_public_id,
            file_name: file.file_name,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
            file_url: file.file_url,
            created_at: file.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareView {
    pub id: String,
    pub file_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub file_url: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub status: ShareStatus,
    pub note: Option<String>,
    pub created_at: String,
    pub responded_at: Option<String>,
}

impl From<SharedFile> for ShareView {
    fn from(share: SharedFile) -> Self {
        Self {
            id: share.public_id,
            file_id: share.file_public_id,
            file_name: share.file_name,
            mime_type: share.mime_type,
            size_bytes: share.size_bytes,
            file_url: share.file_url,
            sender_id: share.sender_public_id,
            recipient_id: share.recipient_public_id,
            status: share.status,
            note: share.note,
            created_at: share.created_at,
            responded_at: share.responded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSessionView {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub language: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CodeSession> for CodeSessionView {
    fn from(session: CodeSession) -> Self {
        Self {
            id: session.public_id,
            owner_id: session.owner_public_id,
            title: session.title,
            language: session.language,
            content: session.content,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    pub users: i64,
    pub direct_messages: i64,
    pub group_messages: i64,
    pub groups: i64,
    pub files: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingView {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: String,
}

impl From<Setting> for SettingView {
    fn from(setting: Setting) -> Self {
        // rows written outside the API may hold bare text
        let value = serde_json::from_str(&setting.value)
            .unwrap_or(serde_json::Value::String(setting.value));
        Self {
            key: setting.key,
            value,
            updated_at: setting.updated_at,
        }
    }
}
