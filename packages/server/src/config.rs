use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    /// When set, registration only accepts addresses ending in `@{email_domain}`.
    pub email_domain: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub blob_dir: PathBuf,
    pub max_blob_size: u64,
}

/// Fixed-window throttle applied to account creation only.
#[derive(Debug, Deserialize, Clone)]
pub struct SignupConfig {
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            rate_limit_max: 10,
            rate_limit_window_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LeaderboardConfig {
    pub global_limit: usize,
    pub event_limit: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            global_limit: 300,
            event_limit: 200,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub signup: SignupConfig,
    pub leaderboard: LeaderboardConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 50)?
            .set_default("auth.token_ttl_days", 7)?
            .set_default("storage.blob_dir", "./data/blobs")?
            .set_default("storage.max_blob_size", 64 * 1024 * 1024)?
            .set_default("signup.rate_limit_max", 10)?
            .set_default("signup.rate_limit_window_secs", 60)?
            .set_default("leaderboard.global_limit", 300)?
            .set_default("leaderboard.event_limit", 200)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CTF__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("CTF").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
