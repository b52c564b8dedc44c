use promo_shared::Masked;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// "development" exposes internal error details in 500 responses.
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServerConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

fn default_environment() -> String {
    "production".into()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Masked<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    /// Process-local, non-durable. For local development and tests.
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Masked<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Served under `/uploads`; offer images live in `<root>/special-offers`.
    pub root: PathBuf,
    pub max_image_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { channel_capacity: 100 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `PROMO__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("PROMO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
