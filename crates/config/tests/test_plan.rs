//! Test plan for the `zoro-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and the unprefixed deployment
//! variables.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use zoro_config::{
    load, AppConfig, CacheConfig, CoffeeBreakConfig, HttpConfig, OrchestratorConfig,
    SuggestionConfig,
};

const ENV_VARS_TO_RESET: &[&str] = &[
    "DATABASE_URL",
    "REDIS_URL",
    "ENCRYPTION_KEY",
    "CORS_ORIGINS",
    "ZORO_CONFIG",
    "ZORO__AUTH__SESSION_TTL_SECONDS",
    "ZORO__CACHE__REDIS_URL",
    "ZORO__CACHE__TTL_SECONDS",
    "ZORO__DATABASE__MAX_CONNECTIONS",
    "ZORO__DATABASE__URL",
    "ZORO__HTTP__ADDRESS",
    "ZORO__HTTP__PORT",
    "ZORO__ORCHESTRATOR__DEFAULT_MODEL",
    "ZORO__ORCHESTRATOR__GEMINI__API_KEY",
    "ZORO__SUGGESTIONS__DEFAULT_COUNT",
    "ZORO__SUGGESTIONS__MAX_COUNT",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

fn isolated() -> (TempDir, TestContext) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());
    (temp_dir, ctx)
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let (_temp_dir, _ctx) = isolated();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.http.cors_origins, defaults.http.cors_origins);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(config.auth.session_ttl_seconds, defaults.auth.session_ttl_seconds);
    assert_eq!(
        config.orchestrator.default_model,
        defaults.orchestrator.default_model
    );
    assert!(config.cache.redis_url.is_none());
    assert_eq!(config.suggestions.default_count, 3);
    assert_eq!(config.coffee_break.duration_seconds, 300);
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "zoro.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/zoro.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "zoro.toml",
        r#"
        [http]
        port = 8181

        [cache]
        ttl_seconds = 90

        [suggestions]
        ai_enabled = false
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, 8181);
    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.cache.ttl_seconds, 90);
    assert_eq!(config.cache.memory_capacity, defaults.cache.memory_capacity);
    assert!(!config.suggestions.ai_enabled);
    assert_eq!(config.suggestions.max_count, defaults.suggestions.max_count);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "zoro.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("ZORO__HTTP__PORT", "8080");
    ctx.set_var("ZORO__ORCHESTRATOR__GEMINI__API_KEY", "gm-test-key");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(
        config.orchestrator.gemini.api_key.as_deref(),
        Some("gm-test-key")
    );
}

#[test]
#[serial]
fn load_reads_well_known_deployment_variables() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var("REDIS_URL", "redis://cache:6379");
    ctx.set_var("ENCRYPTION_KEY", "correct horse battery staple");
    ctx.set_var("CORS_ORIGINS", "https://a.example, https://b.example,");
    ctx.set_var("DATABASE_URL", "sqlite://elsewhere.db");

    let config = load().expect("configuration load should read deployment variables");
    assert_eq!(config.cache.redis_url.as_deref(), Some("redis://cache:6379"));
    assert_eq!(
        config.encryption.key.as_deref(),
        Some("correct horse battery staple")
    );
    assert_eq!(
        config.http.cors_origins,
        vec!["https://a.example".to_string(), "https://b.example".to_string()]
    );
    assert_eq!(config.database.url, "sqlite://elsewhere.db");
}

#[test]
#[serial]
fn load_ignores_blank_well_known_variables() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var("REDIS_URL", "   ");

    let config = load().expect("configuration load should succeed");
    assert!(config.cache.redis_url.is_none());
}

#[test]
#[serial]
fn load_clamps_session_ttl_to_i64_maximum() {
    let (_temp_dir, mut ctx) = isolated();

    let oversized = (i64::MAX as u128 + 42).to_string();
    ctx.set_var("ZORO__AUTH__SESSION_TTL_SECONDS", &oversized);

    let config = load().expect("configuration load should succeed with oversized TTL");
    assert_eq!(config.auth.session_ttl_seconds, i64::MAX as u64);
}

#[test]
#[serial]
fn load_clamps_suggestion_counts() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "zoro.toml",
        r#"
        [suggestions]
        default_count = 6
        max_count = 2
        "#,
    );

    let config = load().expect("configuration load should succeed");
    assert_eq!(config.suggestions.default_count, 6);
    assert_eq!(config.suggestions.max_count, 6);
}

#[test]
#[serial]
fn load_honours_explicit_config_path() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "custom/settings.json",
        r#"{ "coffee_break": { "duration_seconds": 120 } }"#,
    );
    ctx.set_var(
        "ZORO_CONFIG",
        temp_dir.path().join("custom/settings.json").display().to_string(),
    );

    let config = load().expect("configuration load should read the explicit path");
    assert_eq!(config.coffee_break.duration_seconds, 120);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "zoro.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration") || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn section_defaults_match_documented_values() {
    let http = HttpConfig::default();
    assert_eq!(http.address, "127.0.0.1");
    assert_eq!(http.port, 5000);

    let orchestrator = OrchestratorConfig::default();
    assert_eq!(orchestrator.default_model, "gemini-1.5-flash");
    assert!(orchestrator.gemini.api_key.is_none());

    let cache = CacheConfig::default();
    assert_eq!(cache.ttl_seconds, 3_600);
    assert_eq!(cache.memory_capacity, 1_000);

    let suggestions = SuggestionConfig::default();
    assert_eq!(suggestions.max_count, 5);
    assert_eq!(suggestions.recent_ttl_seconds, 600);

    assert_eq!(CoffeeBreakConfig::default().duration_seconds, 300);
}
