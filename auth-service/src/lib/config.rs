use std::collections::HashMap;
use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use thiserror::Error;

/// Startup configuration rejected by [`Config::validate`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid configuration for {key}: {message}")]
pub struct ConfigurationError {
    pub key: String,
    pub message: String,
}

impl ConfigurationError {
    fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cookies: CookieConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Absent `url` selects the in-memory stores.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: i64,
    #[serde(default = "default_refresh_ttl_days")]
    pub refresh_ttl_days: i64,
    #[serde(default = "default_leeway_seconds")]
    pub leeway_seconds: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: default_issuer(),
            audience: default_audience(),
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_days: default_refresh_ttl_days(),
            leeway_seconds: default_leeway_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window_seconds: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 900,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_days")]
    pub ttl_days: i64,
    #[serde(default)]
    pub max_per_user: Option<usize>,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_session_ttl_days(),
            max_per_user: None,
            retention_days: default_retention_days(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { timeout_ms: 3000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CookieConfig {
    pub secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self { secure: true }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OAuthConfig {
    #[serde(default)]
    pub providers: HashMap<String, OAuthProviderConfig>,
}

/// One authorization-code identity provider.
///
/// The `*_field` settings name the userinfo JSON members carrying each
/// profile attribute.
#[derive(Debug, Deserialize, Clone)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    #[serde(default = "default_email_field")]
    pub email_field: String,
    #[serde(default = "default_name_field")]
    pub name_field: String,
    #[serde(default = "default_avatar_field")]
    pub avatar_field: String,
}

fn default_max_connections() -> u32 {
    5
}

fn default_issuer() -> String {
    "auth-service".to_string()
}

fn default_audience() -> String {
    "auth-clients".to_string()
}

fn default_access_ttl_minutes() -> i64 {
    15
}

fn default_refresh_ttl_days() -> i64 {
    7
}

fn default_leeway_seconds() -> u64 {
    30
}

fn default_session_ttl_days() -> i64 {
    7
}

fn default_retention_days() -> i64 {
    30
}

fn default_sweep_interval_seconds() -> u64 {
    300
}

fn default_id_field() -> String {
    "sub".to_string()
}

fn default_email_field() -> String {
    "email".to_string()
}

fn default_name_field() -> String {
    "name".to_string()
}

fn default_avatar_field() -> String {
    "picture".to_string()
}

impl Config {
    const MIN_SECRET_LEN: usize = 32;

    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (JWT__SECRET, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::default().separator("__"))
            .build()?;

        configuration.try_deserialize()
    }

    /// Reject settings the service cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.jwt.secret.len() < Self::MIN_SECRET_LEN {
            return Err(ConfigurationError::new(
                "jwt.secret",
                format!(
                    "must be at least {} bytes, got {}",
                    Self::MIN_SECRET_LEN,
                    self.jwt.secret.len()
                ),
            ));
        }

        let positive = [
            ("jwt.access_ttl_minutes", self.jwt.access_ttl_minutes),
            ("jwt.refresh_ttl_days", self.jwt.refresh_ttl_days),
            ("rate_limit.window_seconds", self.rate_limit.window_seconds),
            ("session.ttl_days", self.session.ttl_days),
            ("session.retention_days", self.session.retention_days),
        ];
        if let Some((key, _)) = positive.iter().find(|(_, value)| *value <= 0) {
            return Err(ConfigurationError::new(*key, "must be greater than zero"));
        }

        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigurationError::new(
                "rate_limit.max_attempts",
                "must be greater than zero",
            ));
        }

        if self.session.sweep_interval_seconds == 0 || self.storage.timeout_ms == 0 {
            return Err(ConfigurationError::new(
                "session.sweep_interval_seconds / storage.timeout_ms",
                "must be greater than zero",
            ));
        }

        if self.session.max_per_user == Some(0) {
            return Err(ConfigurationError::new(
                "session.max_per_user",
                "must be greater than zero when set",
            ));
        }

        for (name, provider) in &self.oauth.providers {
            let urls = [
                ("authorize_url", &provider.authorize_url),
                ("token_url", &provider.token_url),
                ("userinfo_url", &provider.userinfo_url),
                ("redirect_uri", &provider.redirect_uri),
            ];
            for (field, value) in urls {
                url::Url::parse(value).map_err(|e| {
                    ConfigurationError::new(format!("oauth.providers.{}.{}", name, field), e.to_string())
                })?;
            }
        }

        Ok(())
    }
}
