use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use concierge_partners::{
    http_client, AwardAvailability, CashFareSource, DuffelApi, DuffelClient, FirestoreClient, PlaidApi, PlaidClient,
    SeatsAeroClient, SerpApiClient, ServiceAccount,
};
use concierge_store::app_config::{Config, RateLimitConfig, SearchConfig};
use concierge_store::{MemoryStore, PlaidItemStore, RedisClient, SessionStore};
use crate::middleware::Resiliency;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub plaid_items: Arc<dyn PlaidItemStore>,
    pub awards: Arc<dyn AwardAvailability>,
    pub fares: Arc<dyn CashFareSource>,
    pub plaid: Arc<dyn PlaidApi>,
    pub duffel: Arc<dyn DuffelApi>,
    pub resiliency: Arc<Resiliency>,
    pub search: SearchConfig,
    pub rate_limit: RateLimitConfig,
    pub static_dir: PathBuf,
}

impl AppState {
    /// Wires the live partner clients and the configured store.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = http_client(Duration::from_millis(config.server.request_timeout_ms))?;

        let (sessions, local_items): (Arc<dyn SessionStore>, Arc<dyn PlaidItemStore>) = match &config.redis.url {
            Some(url) => {
                let redis = Arc::new(RedisClient::new(url).await.context("invalid redis url")?);
                if let Err(e) = redis.ping().await {
                    tracing::warn!("Redis not reachable yet: {}", e);
                }
                tracing::info!("Using Redis session store");
                let sessions: Arc<dyn SessionStore> = redis.clone();
                let items: Arc<dyn PlaidItemStore> = redis;
                (sessions, items)
            }
            None => {
                tracing::info!("No redis url configured, using in-memory session store");
                let memory = Arc::new(MemoryStore::new());
                let sessions: Arc<dyn SessionStore> = memory.clone();
                let items: Arc<dyn PlaidItemStore> = memory;
                (sessions, items)
            }
        };

        let plaid_items: Arc<dyn PlaidItemStore> = match &config.firebase.service_account_json {
            Some(raw) if !raw.trim().is_empty() => {
                let account = ServiceAccount::from_json(raw).context("invalid firebase service account")?;
                Arc::new(FirestoreClient::new(http.clone(), account))
            }
            _ => local_items,
        };

        Ok(Self {
            sessions,
            plaid_items,
            awards: Arc::new(SeatsAeroClient::new(
                http.clone(),
                &config.seats_aero.base_url,
                &config.seats_aero.api_key,
            )),
            fares: Arc::new(SerpApiClient::new(
                http.clone(),
                &config.serpapi.base_url,
                config.serpapi.api_key.clone(),
            )),
            plaid: Arc::new(PlaidClient::new(
                http.clone(),
                &config.plaid.base_url,
                &config.plaid.client_id,
                &config.plaid.secret,
                &config.plaid.client_name,
            )),
            duffel: Arc::new(DuffelClient::new(
                http,
                &config.duffel.base_url,
                &config.duffel.api_key,
                &config.duffel.version,
            )),
            resiliency: Arc::new(Resiliency::new(
                config.resiliency.failure_threshold,
                Duration::from_secs(config.resiliency.reset_timeout_seconds),
            )),
            search: config.search.clone(),
            rate_limit: config.rate_limit.clone(),
            static_dir: PathBuf::from(&config.server.static_dir),
        })
    }
}
