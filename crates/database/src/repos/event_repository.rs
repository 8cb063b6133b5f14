//! Repositories for team events and admin settings.

use sqlx::SqlitePool;
use tracing::info;

use crate::entities::{Event, NewEvent, Setting, UpdateEvent};
use crate::types::{new_public_id, now_timestamp, DatabaseError, DatabaseResult};

const EVENT_COLUMNS: &str =
    "id, public_id, title, description, location, starts_at, ends_at, created_by, created_at";

#[derive(Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &NewEvent) -> DatabaseResult<Event> {
        let result = sqlx::query(
            "INSERT INTO events (public_id, title, description, location, starts_at, ends_at, created_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_public_id())
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.location)
        .bind(&request.starts_at)
        .bind(&request.ends_at)
        .bind(request.created_by)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(event_id = id, starts_at = %request.starts_at, "created event");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("event {id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    /// Events starting at or after `from` (an RFC 3339 timestamp), soonest first.
    pub async fn upcoming(&self, from: &str, limit: i64) -> DatabaseResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE starts_at >= ? ORDER BY starts_at ASC LIMIT ?"
        ))
        .bind(from)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn list(&self) -> DatabaseResult<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY starts_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn update(&self, id: i64, update: &UpdateEvent) -> DatabaseResult<Event> {
        let result = sqlx::query(
            "UPDATE events SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                location = COALESCE(?, location),
                starts_at = COALESCE(?, starts_at),
                ends_at = COALESCE(?, ends_at)
             WHERE id = ?",
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(&update.location)
        .bind(&update.starts_at)
        .bind(&update.ends_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("event {id}")));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("event {id}")))
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("event {id}")));
        }
        Ok(())
    }
}

/// Repository for admin-managed settings
#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> DatabaseResult<Option<Setting>> {
        let setting = sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_by, updated_at FROM settings WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(setting)
    }

    pub async fn list(&self) -> DatabaseResult<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>(
            "SELECT key, value, updated_by, updated_at FROM settings ORDER BY key ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(settings)
    }

    pub async fn upsert(&self, key: &str, value: &str, updated_by: i64) -> DatabaseResult<Setting> {
        sqlx::query(
            "INSERT INTO settings (key, value, updated_by, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(updated_by)
        .bind(now_timestamp())
        .execute(&self.pool)
        .await?;

        info!(key, updated_by, "stored setting");
        self.get(key)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("setting {key}")))
    }

    pub async fn delete(&self, key: &str) -> DatabaseResult<()> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("setting {key}")));
        }
        Ok(())
    }
}
