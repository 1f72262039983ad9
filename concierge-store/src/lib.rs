pub mod app_config;
pub mod local;
pub mod memory;
pub mod redis_repo;

use async_trait::async_trait;
use chrono::NaiveDate;
use concierge_core::Offer;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Cache key for an indicative cash fare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FareKey {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub travel_class: u8,
}

impl fmt::Display for FareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}-{}", self.origin, self.destination, self.date, self.travel_class)
    }
}

/// Server-side search state: result sessions, the cash fare cache and
/// per-client request counters.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_session(&self, session_id: &str, offers: &[Offer], ttl_seconds: u64) -> StoreResult<()>;

    async fn load_session(&self, session_id: &str) -> StoreResult<Option<Vec<Offer>>>;

    async fn cached_fare(&self, key: &FareKey) -> StoreResult<Option<f64>>;

    async fn cache_fare(&self, key: &FareKey, price: f64, ttl_seconds: u64) -> StoreResult<()>;

    /// Counts one request against `key`; false once `limit` is exceeded
    /// inside the window.
    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> StoreResult<bool>;
}

/// A linked Plaid item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaidItem {
    pub plaid_item_id: String,
    pub access_token: String,
    pub institution_id: Option<String>,
    pub institution_name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
pub trait PlaidItemStore: Send + Sync {
    async fn put_item(&self, item: &PlaidItem) -> StoreResult<()>;

    async fn access_token(&self, item_id: &str) -> StoreResult<Option<String>>;
}
