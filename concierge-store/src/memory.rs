use crate::{FareKey, PlaidItem, PlaidItemStore, SessionStore, StoreResult};
use async_trait::async_trait;
use concierge_core::Offer;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;

struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl_seconds: u64) -> Self {
        Self {
            value,
            expires_at: Instant::now() + Duration::from_secs(ttl_seconds),
        }
    }

    fn live(&self) -> Option<&T> {
        (Instant::now() < self.expires_at).then_some(&self.value)
    }
}

struct Window {
    count: i64,
    started: Instant,
}

/// Process-local store used when no Redis url is configured.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Expiring<Vec<Offer>>>>,
    fares: RwLock<HashMap<FareKey, Expiring<f64>>>,
    windows: RwLock<HashMap<String, Window>>,
    plaid_items: RwLock<HashMap<String, PlaidItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save_session(&self, session_id: &str, offers: &[Offer], ttl_seconds: u64) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.live().is_some());
        sessions.insert(session_id.to_string(), Expiring::new(offers.to_vec(), ttl_seconds));
        info!("Session stored in memory: {} ({} results)", session_id, offers.len());
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> StoreResult<Option<Vec<Offer>>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).and_then(Expiring::live).cloned())
    }

    async fn cached_fare(&self, key: &FareKey) -> StoreResult<Option<f64>> {
        let fares = self.fares.read().await;
        Ok(fares.get(key).and_then(Expiring::live).copied())
    }

    async fn cache_fare(&self, key: &FareKey, price: f64, ttl_seconds: u64) -> StoreResult<()> {
        let mut fares = self.fares.write().await;
        fares.retain(|_, f| f.live().is_some());
        fares.insert(key.clone(), Expiring::new(price, ttl_seconds));
        Ok(())
    }

    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> StoreResult<bool> {
        let window = Duration::from_secs(window_seconds.max(0) as u64);
        let mut windows = self.windows.write().await;
        windows.retain(|_, w| w.started.elapsed() < window);
        let entry = windows.entry(key.to_string()).or_insert_with(|| Window {
            count: 0,
            started: Instant::now(),
        });
        if entry.started.elapsed() >= window {
            entry.count = 0;
            entry.started = Instant::now();
        }
        entry.count += 1;
        Ok(entry.count <= limit)
    }
}

#[async_trait]
impl PlaidItemStore for MemoryStore {
    async fn put_item(&self, item: &PlaidItem) -> StoreResult<()> {
        self.plaid_items
            .write()
            .await
            .insert(item.plaid_item_id.clone(), item.clone());
        Ok(())
    }

    async fn access_token(&self, item_id: &str) -> StoreResult<Option<String>> {
        let items = self.plaid_items.read().await;
        Ok(items.get(item_id).map(|i| i.access_token.clone()))
    }
}
