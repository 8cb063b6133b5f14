//! Zoro Database Crate
//!
//! SQLite connection management, embedded migrations, entity definitions and
//! one repository per aggregate.

use zoro_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::{run_migrations, MIGRATOR};

pub use repos::{
    CodeSessionRepository, EventRepository, GroupRepository, MessageRepository,
    NotificationRepository, SettingsRepository, UserRepository, VaultRepository,
};

pub use entities::{
    CodeSession, ConversationSummary, DirectMessage, Event, Group, GroupMember, GroupMessage,
    GroupRole, MessageType, NewCodeSession, NewDirectMessage, NewEvent, NewGroup,
    NewGroupMessage, NewNotification, NewShare, NewUser, NewZoroFile, Notification,
    NotificationKind, Setting, ShareStatus, SharedFile, UpdateEvent, UpdateProfile, User,
    UserRole, ZoroFile,
};

pub use types::{new_public_id, now_timestamp, DatabaseError, DatabaseResult};

pub use sqlx::SqlitePool;

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn initialize_database_runs_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("init.db").display()),
            max_connections: 2,
        };

        let pool = initialize_database(&config).await.unwrap();
        let users = UserRepository::new(pool).count().await.unwrap();
        assert_eq!(users, 0);
    }
}
