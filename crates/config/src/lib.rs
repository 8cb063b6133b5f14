use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "zoro.toml",
    "config/zoro.toml",
    "crates/config/zoro.toml",
    "../zoro.toml",
    "../config/zoro.toml",
    "zoro.json",
    "config/zoro.json",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub suggestions: SuggestionConfig,
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub coffee_break: CoffeeBreakConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 5000,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://zoro.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: Self::default_session_ttl(),
        }
    }
}

impl AuthConfig {
    const fn default_session_ttl() -> u64 {
        7 * 86_400
    }
}

/// Cache settings shared by the suggestion pipeline.
///
/// Without a `redis_url` only the in-process tier is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "CacheConfig::default_ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "CacheConfig::default_memory_capacity")]
    pub memory_capacity: usize,
}

impl CacheConfig {
    const fn default_ttl() -> u64 {
        3_600
    }

    const fn default_memory_capacity() -> usize {
        1_000
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_seconds: Self::default_ttl(),
            memory_capacity: Self::default_memory_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionConfig {
    #[serde(default = "SuggestionConfig::default_count")]
    pub default_count: usize,
    #[serde(default = "SuggestionConfig::default_max_count")]
    pub max_count: usize,
    #[serde(default = "SuggestionConfig::default_context_window")]
    pub context_window: usize,
    #[serde(default = "SuggestionConfig::default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "SuggestionConfig::default_recent_ttl")]
    pub recent_ttl_seconds: u64,
    #[serde(default = "SuggestionConfig::default_ai_enabled")]
    pub ai_enabled: bool,
    #[serde(default = "SuggestionConfig::default_max_message_chars")]
    pub max_message_chars: usize,
}

impl SuggestionConfig {
    const fn default_count() -> usize {
        3
    }

    const fn default_max_count() -> usize {
        5
    }

    const fn default_context_window() -> usize {
        5
    }

    const fn default_recent_limit() -> usize {
        20
    }

    const fn default_recent_ttl() -> u64 {
        600
    }

    const fn default_ai_enabled() -> bool {
        true
    }

    const fn default_max_message_chars() -> usize {
        500
    }

    fn clamp(&mut self) {
        self.default_count = self.default_count.max(1);
        self.max_count = self.max_count.max(self.default_count);
    }
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            default_count: Self::default_count(),
            max_count: Self::default_max_count(),
            context_window: Self::default_context_window(),
            recent_limit: Self::default_recent_limit(),
            recent_ttl_seconds: Self::default_recent_ttl(),
            ai_enabled: Self::default_ai_enabled(),
            max_message_chars: Self::default_max_message_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub default_model: String,
    #[serde(default)]
    pub gemini: GeminiProviderConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_model: "gemini-1.5-flash".to_string(),
            gemini: GeminiProviderConfig::default(),
        }
    }
}

/// Configuration options for the Gemini text generation provider.
///
/// ```
/// use zoro_config::GeminiProviderConfig;
///
/// let provider = GeminiProviderConfig::default();
/// assert_eq!(provider.base_url, "https://generativelanguage.googleapis.com");
/// assert_eq!(provider.request_timeout_seconds, 20);
/// assert!(provider.api_key.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "GeminiProviderConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "GeminiProviderConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "GeminiProviderConfig::default_temperature")]
    pub temperature: f32,
    #[serde(default = "GeminiProviderConfig::default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl GeminiProviderConfig {
    fn default_base_url() -> String {
        "https://generativelanguage.googleapis.com".to_string()
    }

    const fn default_request_timeout() -> u64 {
        20
    }

    const fn default_temperature() -> f32 {
        0.7
    }

    const fn default_max_output_tokens() -> u32 {
        256
    }
}

impl Default for GeminiProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::default_base_url(),
            request_timeout_seconds: Self::default_request_timeout(),
            temperature: Self::default_temperature(),
            max_output_tokens: Self::default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "EncryptionConfig::default_key_file")]
    pub key_file: String,
}

impl EncryptionConfig {
    fn default_key_file() -> String {
        "data/message.key".to_string()
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key: None,
            key_file: Self::default_key_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoffeeBreakConfig {
    #[serde(default = "CoffeeBreakConfig::default_duration")]
    pub duration_seconds: u64,
}

impl CoffeeBreakConfig {
    const fn default_duration() -> u64 {
        300
    }
}

impl Default for CoffeeBreakConfig {
    fn default() -> Self {
        Self {
            duration_seconds: Self::default_duration(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use zoro_config::load;
///
/// std::env::remove_var("ZORO_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let session_ttl_i64 = i64::try_from(defaults.auth.session_ttl_seconds).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("http.cors_origins", defaults.http.cors_origins.clone())?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default("auth.session_ttl_seconds", session_ttl_i64)?
        .set_default(
            "orchestrator.default_model",
            defaults.orchestrator.default_model.clone(),
        )?;

    let environment_overrides = config::Environment::with_prefix("ZORO").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("ZORO_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via ZORO_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    apply_well_known_env(&mut config);

    if config.auth.session_ttl_seconds > i64::MAX as u64 {
        config.auth.session_ttl_seconds = i64::MAX as u64;
    }
    config.suggestions.clamp();

    debug!(
        http = %format!("{}:{}", config.http.address, config.http.port),
        redis = config.cache.redis_url.is_some(),
        gemini = config.orchestrator.gemini.api_key.is_some(),
        "loaded backend configuration"
    );
    Ok(config)
}

/// Deployment platforms hand out these unprefixed variables.
fn apply_well_known_env(config: &mut AppConfig) {
    if let Some(url) = non_empty_env("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(url) = non_empty_env("REDIS_URL") {
        config.cache.redis_url = Some(url);
    }
    if let Some(key) = non_empty_env("ENCRYPTION_KEY") {
        config.encryption.key = Some(key);
    }
    if let Some(origins) = non_empty_env("CORS_ORIGINS") {
        config.http.cors_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_counts_are_clamped() {
        let mut suggestions = SuggestionConfig {
            default_count: 0,
            max_count: 0,
            ..SuggestionConfig::default()
        };
        suggestions.clamp();
        assert_eq!(suggestions.default_count, 1);
        assert_eq!(suggestions.max_count, 1);

        let mut suggestions = SuggestionConfig {
            default_count: 4,
            max_count: 2,
            ..SuggestionConfig::default()
        };
        suggestions.clamp();
        assert_eq!(suggestions.max_count, 4);
    }
}
