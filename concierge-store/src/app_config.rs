use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    pub search: SearchConfig,
    pub seats_aero: SeatsAeroConfig,
    pub serpapi: SerpApiConfig,
    pub duffel: DuffelConfig,
    pub plaid: PlaidConfig,
    #[serde(default)]
    pub firebase: FirebaseConfig,
    pub rate_limit: RateLimitConfig,
    pub resiliency: ResiliencyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Timeout applied to every outbound partner request.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_static_dir() -> String { "dev".into() }
fn default_request_timeout_ms() -> u64 { 30_000 }

/// Without a url, sessions, fares and Plaid items live in process memory.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub session_ttl_seconds: u64,
    pub fare_cache_ttl_seconds: u64,
    #[serde(default = "default_take")]
    pub take: u32,
    pub max_flex_days: u32,
}

fn default_take() -> u32 { 40 }

#[derive(Debug, Deserialize, Clone)]
pub struct SeatsAeroConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SerpApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DuffelConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub version: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlaidConfig {
    pub base_url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub secret: String,
    pub client_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FirebaseConfig {
    /// Service-account key file contents (JSON). Enables Firestore item storage.
    pub service_account_json: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests: i64,
    pub window_seconds: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResiliencyConfig {
    pub failure_threshold: usize,
    pub reset_timeout_seconds: u64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `CONCIERGE__SEATS_AERO__API_KEY=...`
            .add_source(config::Environment::with_prefix("CONCIERGE").prefix_separator("__").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
