//! Configuration for the art sparker service.
//!
//! Values come from [`AppConfig::default`], then an optional JSON file named by
//! `ART_SPARKER_CONFIG`, then `ART_SPARKER_*` environment overrides.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "ART_SPARKER_CONFIG";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or missing.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// A configured URL does not parse.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    /// The configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid JSON for [`AppConfig`].
    #[error("config file parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote text/image service settings.
    pub llm: LlmConfig,
    /// Prompt generation retry budgets and cache sizing.
    pub generator: GeneratorConfig,
    /// Daily quota settings.
    pub quota: QuotaConfig,
    /// Key-value storage settings.
    pub storage: StorageConfig,
    /// Backend service settings, absent when no backend is configured.
    pub backend: Option<BackendConfig>,
    /// HTTP server settings.
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from the optional file and the process environment.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&PathBuf::from(path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `ART_SPARKER_*` overrides using `lookup` to resolve variables.
    ///
    /// # Errors
    /// Returns an error if a numeric or boolean override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ART_SPARKER_OPENAI_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = lookup("ART_SPARKER_OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup("ART_SPARKER_TEXT_MODEL") {
            self.llm.text_model = model;
        }
        if let Some(model) = lookup("ART_SPARKER_IMAGE_MODEL") {
            self.llm.image_model = model;
        }
        if let Some(limit) = lookup("ART_SPARKER_DAILY_LIMIT") {
            self.quota.daily_limit = parse_override("ART_SPARKER_DAILY_LIMIT", &limit)?;
        }
        if let Some(enabled) = lookup("ART_SPARKER_QUOTA_ENABLED") {
            self.quota.enabled = parse_override("ART_SPARKER_QUOTA_ENABLED", &enabled)?;
        }
        if let Some(path) = lookup("ART_SPARKER_DB_PATH") {
            self.storage.backend = StorageBackend::Sqlite;
            self.storage.sqlite_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("ART_SPARKER_PORT") {
            self.server.port = parse_override("ART_SPARKER_PORT", &port)?;
        }

        match (
            lookup("ART_SPARKER_BACKEND_URL"),
            lookup("ART_SPARKER_BACKEND_ANON_KEY"),
        ) {
            (Some(url), Some(anon_key)) => {
                self.backend = Some(BackendConfig::new(url, anon_key));
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::Invalid(
                    "backend URL and anonymous key must be set together".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.llm.base_url)?;

        if self.llm.text_model.trim().is_empty() || self.llm.image_model.trim().is_empty() {
            return Err(ConfigError::Invalid("model ids must not be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid(
                "llm.temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if self.llm.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "llm.request_timeout must be > 0".to_string(),
            ));
        }

        if self.generator.max_local_attempts == 0 {
            return Err(ConfigError::Invalid(
                "generator.max_local_attempts must be > 0".to_string(),
            ));
        }

        if self.generator.cache_capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "generator.cache_capacity must be > 0 when set".to_string(),
            ));
        }

        if !is_sql_identifier(&self.storage.kv_table) {
            return Err(ConfigError::Invalid(format!(
                "storage.kv_table must be a plain SQL identifier: {}",
                self.storage.kv_table
            )));
        }

        if self.quota.daily_limit == 0 {
            return Err(ConfigError::Invalid(
                "quota.daily_limit must be > 0".to_string(),
            ));
        }

        if let Some(backend) = &self.backend {
            backend.validate()?;
        }

        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, the only table names interpolated into SQL.
fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_override<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name} has an invalid value: {raw}")))
}

/// Remote text/image generation service settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,
    /// Bearer token for the API.
    pub api_key: Option<String>,
    /// Model id used for prompt sentences.
    pub text_model: String,
    /// Model id used for images.
    pub image_model: String,
    /// Sampling temperature for prompt sentences.
    pub temperature: f64,
    /// Whole-request timeout; expiry counts as a service failure.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            text_model: "gpt-4".to_string(),
            image_model: "dall-e-2".to_string(),
            temperature: 1.0,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl LlmConfig {
    /// Set the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Retry budgets for prompt generation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Remote attempts before falling back to the corpus.
    pub max_remote_attempts: u32,
    /// Corpus syntheses looking for an unseen, concrete sentence.
    pub max_local_attempts: u32,
    /// Optional LRU bound on remembered prompts; unbounded when `None`.
    pub cache_capacity: Option<usize>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_remote_attempts: 5,
            max_local_attempts: 10,
            cache_capacity: None,
        }
    }
}

/// Daily quota settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// When false, generation is neither checked nor counted.
    pub enabled: bool,
    /// Generations allowed per calendar day.
    pub daily_limit: u32,
    /// Generations granted back by one rewarded bonus.
    pub bonus_amount: u32,
    /// Simulated rewarded-ad duration in milliseconds.
    pub ad_delay_ms: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_limit: 10,
            bonus_amount: 10,
            ad_delay_ms: 2000,
        }
    }
}

impl QuotaConfig {
    /// Rewarded-ad delay as a [`Duration`].
    #[must_use]
    pub const fn ad_delay(&self) -> Duration {
        Duration::from_millis(self.ad_delay_ms)
    }
}

/// Which key-value backend to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process-local map; nothing survives a restart.
    Memory,
    /// `SQLite` file.
    #[default]
    Sqlite,
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Selected backend.
    pub backend: StorageBackend,
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Key-value table name.
    pub kv_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            sqlite_path: PathBuf::from("art_sparker.sqlite"),
            kv_table: "kv_store".to_string(),
        }
    }
}

impl StorageConfig {
    /// In-memory storage, mostly for tests and throwaway runs.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            ..Self::default()
        }
    }
}

/// Backend-as-a-service connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL.
    pub url: String,
    /// Anonymous (public) API key.
    pub anon_key: String,
    /// Value sent in the `X-Client-Info` header.
    #[serde(default = "default_client_info")]
    pub client_info: String,
}

fn default_client_info() -> String {
    format!("art-sparker@{}", env!("CARGO_PKG_VERSION"))
}

impl BackendConfig {
    /// Create a backend config with the default client info header.
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            client_info: default_client_info(),
        }
    }

    /// Validate the connection settings.
    ///
    /// # Errors
    /// Returns an error if the URL or key is missing or malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() || self.anon_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "missing backend URL or anonymous key".to_string(),
            ));
        }
        Url::parse(&self.url)?;
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: crate::server::DEFAULT_PORT,
        }
    }
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.quota.daily_limit, 10);
        assert_eq!(config.quota.bonus_amount, 10);
        assert_eq!(config.generator.max_remote_attempts, 5);
        assert_eq!(config.generator.max_local_attempts, 10);
        assert_eq!(config.llm.request_timeout, Duration::from_secs(30));
        assert!(config.backend.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("ART_SPARKER_DAILY_LIMIT", "3"),
                ("ART_SPARKER_QUOTA_ENABLED", "false"),
                ("ART_SPARKER_PORT", "8080"),
                ("ART_SPARKER_BACKEND_URL", "https://project.example.co"),
                ("ART_SPARKER_BACKEND_ANON_KEY", "anon"),
            ]))
            .unwrap();

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.quota.daily_limit, 3);
        assert!(!config.quota.enabled);
        assert_eq!(config.server.port, 8080);
        let backend = config.backend.as_ref().unwrap();
        assert!(backend.client_info.starts_with("art-sparker@"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_half_configured_backend_is_rejected() {
        let mut config = AppConfig::default();
        let result =
            config.apply_overrides(lookup_from(&[("ART_SPARKER_BACKEND_URL", "https://x.co")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(lookup_from(&[("ART_SPARKER_DAILY_LIMIT", "ten")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limit() {
        let mut config = AppConfig::default();
        config.quota.daily_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsafe_table_name() {
        let mut config = AppConfig::default();
        config.storage.kv_table = "kv; DROP TABLE kv".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.storage.kv_table = "1kv".to_string();
        assert!(config.validate().is_err());

        config.storage.kv_table = "_kv_store2".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_port() {
        assert_eq!(ServerConfig::default().port, crate::server::DEFAULT_PORT);
    }

    #[test]
    fn test_partial_json_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"quota": {"daily_limit": 25}, "llm": {"request_timeout": 15}}"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.quota.daily_limit, 25);
        assert_eq!(config.quota.bonus_amount, 10);
        assert_eq!(config.llm.request_timeout, Duration::from_secs(15));
        assert_eq!(config.llm.text_model, "gpt-4");
    }
}
