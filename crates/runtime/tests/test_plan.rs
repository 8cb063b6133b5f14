use std::{env, path::Path, time::Duration};

use anyhow::{Context, Result};
use serial_test::serial;
use sqlx::Row;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};
use zoro_config::AppConfig;
use zoro_runtime::{self, BackendServices};

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

fn build_config(temp_dir: &TempDir, database_url: String, max_connections: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url;
    config.database.max_connections = max_connections;
    config.orchestrator.gemini.api_key = Some("unit-test-key".into());
    config.encryption.key = None;
    config.encryption.key_file = temp_dir
        .path()
        .join("keys/message.key")
        .to_string_lossy()
        .into_owned();
    config.cache.redis_url = None;
    config
}

async fn initialise(config: &AppConfig) -> Result<BackendServices> {
    BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn initialise_runs_migrations_and_bootstraps_orchestrator() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/init.db");
    let config = build_config(&temp_dir, sqlite_url(&db_path), 4);

    let services = initialise(&config).await?;
    let table: String = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'users'",
    )
    .fetch_one(&services.db_pool)
    .await?;

    assert_eq!("users", table);
    assert_eq!(config.orchestrator.default_model, services.orchestrator.active_model());
    assert!(services.orchestrator.is_available());
    assert!(services.suggestions.ai_available());

    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn initialise_without_gemini_key_disables_ai() -> Result<()> {
    env::remove_var("GEMINI_API_KEY");
    let temp_dir = TempDir::new()?;
    let mut config = build_config(&temp_dir, "sqlite://:memory:".into(), 1);
    config.orchestrator.gemini.api_key = None;

    let services = initialise(&config).await?;
    assert!(!services.orchestrator.is_available());
    assert!(!services.suggestions.ai_available());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn initialise_creates_encryption_key_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(&temp_dir, "sqlite://:memory:".into(), 1);
    let key_path = Path::new(&config.encryption.key_file).to_path_buf();
    assert!(!key_path.exists());

    let services = initialise(&config).await?;
    assert!(key_path.exists(), "a key file should be generated on first start");

    let sealed = services.cipher.encrypt("hello")?;
    assert_eq!("hello", services.cipher.decrypt(&sealed)?);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn initialise_tolerates_unreachable_redis() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = build_config(&temp_dir, "sqlite://:memory:".into(), 1);
    config.cache.redis_url = Some("redis://127.0.0.1:1/".into());

    let services = initialise(&config).await?;
    assert!(
        services.redis_conn.is_none(),
        "redis connection errors should be tolerated"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn initialise_ignores_invalid_redis_url() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = build_config(&temp_dir, "sqlite://:memory:".into(), 1);
    config.cache.redis_url = Some("not a url".into());

    let services = initialise(&config).await?;
    assert!(services.redis_conn.is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn prepare_database_creates_sqlite_directory_if_missing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_dir = temp_dir.path().join("nested");
    let db_path = db_dir.join("prepared.db");
    let config = build_config(&temp_dir, sqlite_url(&db_path), 2);

    assert!(!db_dir.exists());

    let services = initialise(&config).await?;
    assert!(db_dir.exists(), "database directory should be created");
    assert!(db_path.exists(), "database file should be created");
    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn prepare_database_enables_sqlite_foreign_keys() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/foreign_keys.db");
    let config = build_config(&temp_dir, sqlite_url(&db_path), 2);

    let services = initialise(&config).await?;

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&services.db_pool)
        .await?;
    assert_eq!(1, enabled, "foreign key enforcement must be enabled");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn prepare_database_applies_max_connections_setting() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/max_conn.db");
    let max_connections = 3;
    let config = build_config(&temp_dir, sqlite_url(&db_path), max_connections);

    let services = initialise(&config).await?;
    assert_eq!(
        max_connections,
        services.db_pool.options().get_max_connections()
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn memory_database_has_no_backing_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(&temp_dir, "sqlite://:memory:".into(), 1);
    let services = initialise(&config).await?;

    let databases = sqlx::query("PRAGMA database_list")
        .fetch_all(&services.db_pool)
        .await?;
    let main_db = databases
        .into_iter()
        .find(|row| {
            row.try_get::<String, _>("name")
                .map(|name| name == "main")
                .unwrap_or(false)
        })
        .context("expected main in PRAGMA database_list")?;
    let file: String = main_db.try_get("file")?;
    assert!(
        file.is_empty(),
        "in-memory sqlite database should not create filesystem entries"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn non_sqlite_urls_fail_without_touching_the_filesystem() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target_dir = temp_dir.path().join("should_not_exist");
    let malformed_url = format!("postgres://{}/ignored.db", target_dir.to_string_lossy());
    let config = build_config(&temp_dir, malformed_url, 1);

    let error = match BackendServices::initialise(&config).await {
        Ok(_) => panic!("expected sqlite connection to fail for non-sqlite URL"),
        Err(error) => error,
    };
    assert!(
        !target_dir.exists(),
        "non-sqlite URLs must not create filesystem structures"
    );
    assert!(
        format!("{error:#}").contains("failed to initialise database"),
        "expected database initialisation context, got {error:#}"
    );
    Ok(())
}

#[test]
fn telemetry_init_tracing_sets_global_subscriber() {
    zoro_runtime::telemetry::init_tracing().expect("first initialisation should succeed");

    let second = zoro_runtime::telemetry::init_tracing();
    assert!(
        second.is_err(),
        "initialising telemetry twice should fail with global subscriber already set"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
#[cfg_attr(not(unix), ignore = "requires Unix signal handling")]
async fn shutdown_signal_completes_on_ctrl_c_notification() -> Result<()> {
    let shutdown_task = tokio::spawn(async { zoro_runtime::shutdown_signal().await });

    sleep(Duration::from_millis(50)).await;
    #[cfg(unix)]
    unsafe {
        libc::raise(libc::SIGINT);
    }

    timeout(Duration::from_secs(2), shutdown_task).await??;
    Ok(())
}
