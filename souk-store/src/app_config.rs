use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Rate limiting is disabled when absent.
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub leads: LeadSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
}

fn default_rate_limit() -> i64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Outbound push gateway. Messages are only logged when `gateway_url` is unset.
#[derive(Debug, Deserialize, Clone)]
pub struct PushConfig {
    pub gateway_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_push_timeout")]
    pub timeout_seconds: u64,
}

fn default_push_timeout() -> u64 {
    5
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            api_key: None,
            timeout_seconds: default_push_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct FeedSettings {
    pub default_limit: i64,
    pub max_limit: i64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct LeadSettings {
    pub dedup_window_hours: i64,
}

impl Default for LeadSettings {
    fn default() -> Self {
        Self { dedup_window_hours: 24 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in.
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SOUK__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("SOUK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
