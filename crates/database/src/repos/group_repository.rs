//! Repository for group, membership and group message data access.

use sqlx::SqlitePool;
use tracing::info;

use crate::entities::{Group, GroupMember, GroupMessage, GroupRole, NewGroup, NewGroupMessage};
use crate::types::{new_public_id, now_timestamp, DatabaseError, DatabaseResult};

const GROUP_SELECT: &str = "SELECT g.id, g.public_id, g.name, g.description, g.created_by,
        (SELECT COUNT(*) FROM group_members gm WHERE gm.group_id = g.id) AS member_count,
        g.created_at, g.updated_at
     FROM groups g";

const MEMBER_SELECT: &str = "SELECT gm.group_id, gm.user_id, u.public_id AS user_public_id,
        u.display_name, u.email, gm.role, gm.joined_at
     FROM group_members gm
     JOIN users u ON u.id = gm.user_id";

const GROUP_MESSAGE_SELECT: &str = "SELECT m.id, m.public_id, m.group_id, m.sender_id,
        u.public_id AS sender_public_id, u.display_name AS sender_display_name,
        m.content, m.message_type, m.created_at
     FROM group_messages m
     JOIN users u ON u.id = m.sender_id";

/// Repository for group database operations
#[derive(Clone)]
pub struct GroupRepository {
    pool: SqlitePool,
}

impl GroupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the group and its memberships in one transaction. The creator
    /// becomes owner; repeated or creator ids in `member_ids` are ignored.
    pub async fn create(&self, request: &NewGroup) -> DatabaseResult<Group> {
        let public_id = new_public_id();
        let now = now_timestamp();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO groups (public_id, name, description, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        let group_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO group_members (group_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)",
        )
        .bind(group_id)
        .bind(request.created_by)
        .bind(GroupRole::Owner)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for member_id in &request.member_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO group_members (group_id, user_id, role, joined_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(group_id)
            .bind(member_id)
            .bind(GroupRole::Member)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(group_id, public_id = %public_id, created_by = request.created_by, "created group");

        self.find_by_id(group_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("group {group_id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!("{GROUP_SELECT} WHERE g.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!("{GROUP_SELECT} WHERE g.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    pub async fn list_for_member(&self, user_id: i64) -> DatabaseResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(&format!(
            "{GROUP_SELECT}
             WHERE g.id IN (SELECT group_id FROM group_members WHERE user_id = ?)
             ORDER BY g.updated_at DESC, g.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    /// Members in join order.
    pub async fn members(&self, group_id: i64) -> DatabaseResult<Vec<GroupMember>> {
        let members = sqlx::query_as::<_, GroupMember>(&format!(
            "{MEMBER_SELECT} WHERE gm.group_id = ? ORDER BY gm.joined_at ASC, gm.rowid ASC"
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn member_role(&self, group_id: i64, user_id: i64) -> DatabaseResult<Option<GroupRole>> {
        let role = sqlx::query_scalar::<_, GroupRole>(
            "SELECT role FROM group_members WHERE group_id = ? AND user_id = ?",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    pub async fn is_member(&self, group_id: i64, user_id: i64) -> DatabaseResult<bool> {
        Ok(self.member_role(group_id, user_id).await?.is_some())
    }

    /// Returns false when the user already belonged to the group.
    pub async fn add_member(&self, group_id: i64, user_id: i64, role: GroupRole) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO group_members (group_id, user_id, role, joined_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(role)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            self.touch(group_id).await?;
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn remove_member(&self, group_id: i64, user_id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!(
                "member {user_id} of group {group_id}"
            )));
        }
        self.touch(group_id).await
    }

    pub async fn update_member_role(
        &self,
        group_id: i64,
        user_id: i64,
        role: GroupRole,
    ) -> DatabaseResult<()> {
        let result =
            sqlx::query("UPDATE group_members SET role = ? WHERE group_id = ? AND user_id = ?")
                .bind(role)
                .bind(group_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!(
                "member {user_id} of group {group_id}"
            )));
        }
        Ok(())
    }

    /// Earliest joined member other than `excluding`, used for ownership hand-off.
    pub async fn longest_standing_member(
        &self,
        group_id: i64,
        excluding: i64,
    ) -> DatabaseResult<Option<i64>> {
        let user_id = sqlx::query_scalar(
            "SELECT user_id FROM group_members
             WHERE group_id = ? AND user_id != ?
             ORDER BY joined_at ASC, rowid ASC
             LIMIT 1",
        )
        .bind(group_id)
        .bind(excluding)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user_id)
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("group {id}")));
        }
        info!(group_id = id, "deleted group");
        Ok(())
    }

    pub async fn create_message(&self, request: &NewGroupMessage) -> DatabaseResult<GroupMessage> {
        let public_id = new_public_id();
        let result = sqlx::query(
            "INSERT INTO group_messages (public_id, group_id, sender_id, content, message_type, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.group_id)
        .bind(request.sender_id)
        .bind(&request.content)
        .bind(request.message_type)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        self.touch(request.group_id).await?;

        let message = sqlx::query_as::<_, GroupMessage>(&format!(
            "{GROUP_MESSAGE_SELECT} WHERE m.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        message.ok_or_else(|| DatabaseError::not_found(format!("group message {id}")))
    }

    pub async fn find_message(&self, group_id: i64, public_id: &str) -> DatabaseResult<Option<GroupMessage>> {
        let message = sqlx::query_as::<_, GroupMessage>(&format!(
            "{GROUP_MESSAGE_SELECT} WHERE m.group_id = ? AND m.public_id = ?"
        ))
        .bind(group_id)
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    /// Group messages newest first, optionally before a message id.
    pub async fn messages(
        &self,
        group_id: i64,
        limit: i64,
        before: Option<i64>,
    ) -> DatabaseResult<Vec<GroupMessage>> {
        let messages = sqlx::query_as::<_, GroupMessage>(&format!(
            "{GROUP_MESSAGE_SELECT}
             WHERE m.group_id = ? AND (? IS NULL OR m.id < ?)
             ORDER BY m.id DESC
             LIMIT ?"
        ))
        .bind(group_id)
        .bind(before)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn count(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM groups")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_messages(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM group_messages")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn touch(&self, group_id: i64) -> DatabaseResult<()> {
        sqlx::query("UPDATE groups SET updated_at = ? WHERE id = ?")
            .bind(now_timestamp())
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
