//! Database migrations

use anyhow::Context;
use sqlx::SqlitePool;
use tracing::info;

/// Migrations embedded from the workspace-level `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("database migrations failed")?;
    info!("database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::prepare_database;
    use tempfile::TempDir;
    use zoro_config::DatabaseConfig;

    #[tokio::test]
    async fn migrations_create_every_table() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_migrations.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
        };

        let pool = prepare_database(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();

        for table in [
            "users",
            "sessions",
            "messages",
            "groups",
            "group_members",
            "group_messages",
            "zoro_files",
            "shared_files",
            "notifications",
            "code_sessions",
            "events",
            "settings",
        ] {
            let found: Option<String> =
                sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                    .bind(table)
                    .fetch_optional(&pool)
                    .await
                    .unwrap();
            assert_eq!(found.as_deref(), Some(table));
        }

        // Re-running is a no-op.
        run_migrations(&pool).await.unwrap();
    }
}
