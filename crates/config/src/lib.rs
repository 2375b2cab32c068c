//! Configuration loading, validation, and management for the myPlant backend.
//!
//! Loads configuration from `~/.myplant/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.myplant/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Push-notification configuration
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Server-side secrets
    #[serde(default)]
    pub secrets: SecretsConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Header in which the fronting platform passes the authenticated uid.
    #[serde(default = "default_identity_header")]
    pub identity_header: String,

    /// Log each request/response pair at debug level.
    #[serde(default = "default_true")]
    pub trace_requests: bool,
}

fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_identity_header() -> String {
    "x-myplant-uid".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            identity_header: default_identity_header(),
            trace_requests: true,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Response-length budget per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_max_tokens() -> u32 {
    600
}
fn default_temperature() -> f32 {
    1.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "firestore" or "memory"
    #[serde(default = "default_store_backend")]
    pub backend: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    /// Override for the Firestore REST endpoint (emulators, proxies)
    #[serde(default = "default_firestore_url")]
    pub base_url: String,

    /// OAuth access token for the Firestore REST API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

fn default_store_backend() -> String {
    "firestore".into()
}
fn default_database() -> String {
    "(default)".into()
}
fn default_firestore_url() -> String {
    "https://firestore.googleapis.com/v1".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            project_id: None,
            database: default_database(),
            base_url: default_firestore_url(),
            access_token: None,
        }
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("base_url", &self.base_url)
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// "fcm" or "log"
    #[serde(default = "default_notify_backend")]
    pub backend: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default = "default_fcm_url")]
    pub base_url: String,

    /// OAuth access token for the FCM HTTP v1 API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Broadcast topic for admin alerts
    #[serde(default = "default_topic")]
    pub topic: String,
}

fn default_notify_backend() -> String {
    "fcm".into()
}
fn default_fcm_url() -> String {
    "https://fcm.googleapis.com/v1".into()
}
fn default_topic() -> String {
    "admins".into()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            backend: default_notify_backend(),
            project_id: None,
            base_url: default_fcm_url(),
            access_token: None,
            topic: default_topic(),
        }
    }
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("backend", &self.backend)
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .field("access_token", &redact(&self.access_token))
            .field("topic", &self.topic)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Secret the data-encryption key is derived from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_admin_key: Option<String>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("encryption_admin_key", &redact(&self.encryption_admin_key))
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.myplant/config.toml),
    /// then apply environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_with(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Secrets set in the environment win over the file; empty values are
    /// ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("MYPLANT_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = get("MYPLANT_PORT").and_then(|p| p.parse().ok()) {
            self.gateway.port = port;
        }

        if let Some(url) = get("MYPLANT_LLM_URL") {
            self.llm.api_url = url;
        }
        if let Some(key) = get("OPENAI_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = get("MYPLANT_MODEL") {
            self.llm.model = model;
        }

        if let Some(backend) = get("MYPLANT_STORE") {
            self.store.backend = backend;
        }
        if let Some(backend) = get("MYPLANT_NOTIFY") {
            self.notify.backend = backend;
        }
        if let Some(project) = get("MYPLANT_PROJECT_ID") {
            self.store.project_id.get_or_insert_with(|| project.clone());
            self.notify.project_id.get_or_insert(project);
        }
        if let Some(token) = get("MYPLANT_FIRESTORE_TOKEN") {
            self.store.access_token = Some(token);
        }
        if let Some(token) = get("MYPLANT_FCM_TOKEN") {
            self.notify.access_token = Some(token);
        }

        if let Some(secret) = get("ENCRYPTION_ADMIN_KEY") {
            self.secrets.encryption_admin_key = Some(secret);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".myplant")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "llm.max_tokens must be > 0".into(),
            ));
        }

        if !matches!(self.store.backend.as_str(), "firestore" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "store.backend must be \"firestore\" or \"memory\", got \"{}\"",
                self.store.backend
            )));
        }

        if !matches!(self.notify.backend.as_str(), "fcm" | "log") {
            return Err(ConfigError::ValidationError(format!(
                "notify.backend must be \"fcm\" or \"log\", got \"{}\"",
                self.notify.backend
            )));
        }

        if self.notify.topic.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "notify.topic must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an LLM API key is available (from config or environment).
    pub fn has_llm_key(&self) -> bool {
        self.llm.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 600);
        assert_eq!(config.notify.topic, "admins");
        assert_eq!(config.store.database, "(default)");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.model, config.llm.model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.llm.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_backends_rejected() {
        let mut config = AppConfig::default();
        config.store.backend = "mongo".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.notify.backend = "sms".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().store.backend, "firestore");
    }

    #[test]
    fn parses_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[gateway]
port = 9000

[store]
backend = "memory"

[notify]
backend = "log"
topic = "growers"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.notify.topic, "growers");
        assert_eq!(config.llm.max_tokens, 600);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gateway\nport = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[
            ("OPENAI_KEY", "sk-test"),
            ("ENCRYPTION_ADMIN_KEY", "s3cret"),
            ("MYPLANT_PROJECT_ID", "myplant-prod"),
            ("MYPLANT_PORT", "9100"),
            ("MYPLANT_FCM_TOKEN", "ya29.token"),
        ]));

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.secrets.encryption_admin_key.as_deref(), Some("s3cret"));
        assert_eq!(config.store.project_id.as_deref(), Some("myplant-prod"));
        assert_eq!(config.notify.project_id.as_deref(), Some("myplant-prod"));
        assert_eq!(config.notify.access_token.as_deref(), Some("ya29.token"));
        assert_eq!(config.gateway.port, 9100);
    }

    #[test]
    fn env_project_does_not_replace_file_value() {
        let mut config = AppConfig::default();
        config.store.project_id = Some("from-file".into());
        config.apply_env_with(env(&[("MYPLANT_PROJECT_ID", "from-env")]));
        assert_eq!(config.store.project_id.as_deref(), Some("from-file"));
        assert_eq!(config.notify.project_id.as_deref(), Some("from-env"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_with(env(&[("OPENAI_KEY", ""), ("MYPLANT_PORT", "not-a-port")]));
        assert!(config.llm.api_key.is_none());
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("sk-live-abcdef".into());
        config.secrets.encryption_admin_key = Some("super-secret".into());
        config.store.access_token = Some("ya29.store".into());

        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-live-abcdef"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("ya29.store"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gpt-4o-mini"));
        assert!(toml_str.contains("admins"));
    }
}
