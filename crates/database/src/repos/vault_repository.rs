//! Repository for vault files and file shares.

use sqlx::SqlitePool;
use tracing::info;

use crate::entities::{NewShare, NewZoroFile, ShareStatus, SharedFile, ZoroFile};
use crate::types::{new_public_id, now_timestamp, DatabaseError, DatabaseResult};

const FILE_SELECT: &str = "SELECT f.id, f.public_id, f.owner_id, u.public_id AS owner_public_id,
        f.file_name, f.mime_type, f.size_bytes, f.file_url, f.created_at
     FROM zoro_files f
     JOIN users u ON u.id = f.owner_id";

const SHARE_SELECT: &str = "SELECT s.id, s.public_id, s.file_id, f.public_id AS file_public_id,
        f.file_name, f.mime_type, f.size_bytes, f.file_url,
        s.sender_id, su.public_id AS sender_public_id,
        s.recipient_id, ru.public_id AS recipient_public_id,
        s.status, s.note, s.created_at, s.responded_at
     FROM shared_files s
     JOIN zoro_files f ON f.id = s.file_id
     JOIN users su ON su.id = s.sender_id
     JOIN users ru ON ru.id = s.recipient_id";

/// Repository for vault database operations
#[derive(Clone)]
pub struct VaultRepository {
    pool: SqlitePool,
}

impl VaultRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_file(&self, request: &NewZoroFile) -> DatabaseResult<ZoroFile> {
        let public_id = new_public_id();
        let result = sqlx::query(
            "INSERT INTO zoro_files (public_id, owner_id, file_name, mime_type, size_bytes, file_url, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.owner_id)
        .bind(&request.file_name)
        .bind(&request.mime_type)
        .bind(request.size_bytes)
        .bind(&request.file_url)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(file_id = id, owner_id = request.owner_id, size_bytes = request.size_bytes, "registered vault file");

        self.find_file(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("file {id}")))
    }

    pub async fn find_file(&self, id: i64) -> DatabaseResult<Option<ZoroFile>> {
        let file = sqlx::query_as::<_, ZoroFile>(&format!("{FILE_SELECT} WHERE f.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(file)
    }

    pub async fn find_file_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<ZoroFile>> {
        let file = sqlx::query_as::<_, ZoroFile>(&format!("{FILE_SELECT} WHERE f.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(file)
    }

    pub async fn list_owned(&self, owner_id: i64) -> DatabaseResult<Vec<ZoroFile>> {
        let files = sqlx::query_as::<_, ZoroFile>(&format!(
            "{FILE_SELECT} WHERE f.owner_id = ? ORDER BY f.id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    /// Files other users shared with `recipient_id` that were accepted.
    pub async fn list_received(&self, recipient_id: i64) -> DatabaseResult<Vec<ZoroFile>> {
        let files = sqlx::query_as::<_, ZoroFile>(&format!(
            "{FILE_SELECT}
             WHERE f.id IN (
                 SELECT file_id FROM shared_files WHERE recipient_id = ? AND status = 'accepted'
             )
             ORDER BY f.id DESC"
        ))
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    pub async fn delete_file(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM zoro_files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("file {id}")));
        }
        Ok(())
    }

    pub async fn count_files(&self) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM zoro_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn create_share(&self, request: &NewShare) -> DatabaseResult<SharedFile> {
        let public_id = new_public_id();
        let result = sqlx::query(
            "INSERT INTO shared_files (public_id, file_id, sender_id, recipient_id, status, note, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.file_id)
        .bind(request.sender_id)
        .bind(request.recipient_id)
        .bind(ShareStatus::Pending)
        .bind(&request.note)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(share_id = id, file_id = request.file_id, recipient_id = request.recipient_id, "shared vault file");

        self.find_share(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("share {id}")))
    }

    pub async fn find_share(&self, id: i64) -> DatabaseResult<Option<SharedFile>> {
        let share = sqlx::query_as::<_, SharedFile>(&format!("{SHARE_SELECT} WHERE s.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(share)
    }

    pub async fn find_share_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<SharedFile>> {
        let share =
            sqlx::query_as::<_, SharedFile>(&format!("{SHARE_SELECT} WHERE s.public_id = ?"))
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(share)
    }

    pub async fn has_pending_share(&self, file_id: i64, recipient_id: i64) -> DatabaseResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shared_files
             WHERE file_id = ? AND recipient_id = ? AND status = 'pending'",
        )
        .bind(file_id)
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn incoming(&self, recipient_id: i64, status: Option<ShareStatus>) -> DatabaseResult<Vec<SharedFile>> {
        let shares = sqlx::query_as::<_, SharedFile>(&format!(
            "{SHARE_SELECT}
             WHERE s.recipient_id = ? AND (? IS NULL OR s.status = ?)
             ORDER BY s.id DESC"
        ))
        .bind(recipient_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(shares)
    }

    pub async fn outgoing(&self, sender_id: i64) -> DatabaseResult<Vec<SharedFile>> {
        let shares = sqlx::query_as::<_, SharedFile>(&format!(
            "{SHARE_SELECT} WHERE s.sender_id = ? ORDER BY s.id DESC"
        ))
        .bind(sender_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shares)
    }

    /// Moves a pending share to `status`. Returns `NotFound` when the share is
    /// missing or already answered.
    pub async fn respond(&self, share_id: i64, status: ShareStatus) -> DatabaseResult<SharedFile> {
        let result = sqlx::query(
            "UPDATE shared_files SET status = ?, responded_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(status)
        .bind(now_timestamp())
        .bind(share_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("pending share {share_id}")));
        }

        self.find_share(share_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("share {share_id}")))
    }
}
