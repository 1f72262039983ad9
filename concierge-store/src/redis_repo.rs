use crate::{FareKey, PlaidItem, PlaidItemStore, SessionStore, StoreResult};
use async_trait::async_trait;
use concierge_core::Offer;
use redis::{AsyncCommands, RedisResult};
use tracing::{debug, info};

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

fn fare_key(key: &FareKey) -> String {
    format!("fare:{}", key)
}

fn plaid_item_key(item_id: &str) -> String {
    format!("plaid_item:{}", item_id)
}

/// Fixed window: the expiry is set by the first hit only, so later hits
/// never extend the window.
const FIXED_WINDOW_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisClient {
    async fn save_session(&self, session_id: &str, offers: &[Offer], ttl_seconds: u64) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(offers)?;
        conn.set_ex::<_, _, ()>(session_key(session_id), payload, ttl_seconds).await?;
        info!("Session stored: {} ({} results)", session_id, offers.len());
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> StoreResult<Option<Vec<Offer>>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(session_key(session_id)).await?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn cached_fare(&self, key: &FareKey) -> StoreResult<Option<f64>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let price: Option<f64> = conn.get(fare_key(key)).await?;
        if price.is_some() {
            debug!("Fare cache hit: {}", key);
        }
        Ok(price)
    }

    async fn cache_fare(&self, key: &FareKey, price: f64, ttl_seconds: u64) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(fare_key(key), price, ttl_seconds).await?;
        Ok(())
    }

    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> StoreResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let count: i64 = redis::Script::new(FIXED_WINDOW_SCRIPT)
            .key(key)
            .arg(window_seconds)
            .invoke_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

#[async_trait]
impl PlaidItemStore for RedisClient {
    async fn put_item(&self, item: &PlaidItem) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = plaid_item_key(&item.plaid_item_id);
        let payload = serde_json::to_string(item)?;
        conn.hset::<_, _, _, ()>(&key, "item", payload).await?;
        conn.hset::<_, _, _, ()>(&key, "access_token", &item.access_token).await?;
        info!("Plaid item stored: {}", item.plaid_item_id);
        Ok(())
    }

    async fn access_token(&self, item_id: &str) -> StoreResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let token: Option<String> = conn.hget(plaid_item_key(item_id), "access_token").await?;
        Ok(token)
    }
}
