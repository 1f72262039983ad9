use crate::{ensure_success, PartnerError, PartnerResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use concierge_core::Cabin;
use serde_json::{json, Value};
use tracing::info;

#[async_trait]
pub trait DuffelApi: Send + Sync {
    /// Creates an offer request; `body` is the Duffel request document.
    async fn create_offer_request(&self, body: &Value) -> PartnerResult<Value>;
}

/// Duffel names premium economy in full.
fn cabin_class(cabin: Cabin) -> &'static str {
    match cabin {
        Cabin::Economy => "economy",
        Cabin::Premium => "premium_economy",
        Cabin::Business => "business",
        Cabin::First => "first",
    }
}

/// Largest party Duffel accepts on one offer request.
pub const MAX_PASSENGERS: u32 = 9;

/// A one-way offer request for `passengers` adults, clamped to `1..=MAX_PASSENGERS`.
pub fn one_way_request(origin: &str, destination: &str, date: NaiveDate, cabin: Cabin, passengers: u32) -> Value {
    let travellers: Vec<Value> = (0..passengers.clamp(1, MAX_PASSENGERS))
        .map(|_| json!({ "type": "adult" }))
        .collect();
    json!({
        "data": {
            "slices": [
                { "origin": origin, "destination": destination, "departure_date": date.to_string() }
            ],
            "passengers": travellers,
            "cabin_class": cabin_class(cabin)
        }
    })
}

#[derive(Clone)]
pub struct DuffelClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    version: String,
}

impl DuffelClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            version: version.into(),
        }
    }
}

#[async_trait]
impl DuffelApi for DuffelClient {
    async fn create_offer_request(&self, body: &Value) -> PartnerResult<Value> {
        if self.api_key.is_empty() {
            return Err(PartnerError::MissingCredentials("duffel.api_key"));
        }

        let response = self
            .http
            .post(format!("{}/air/offer_requests", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Duffel-Version", &self.version)
            .json(body)
            .send()
            .await?;

        let data: Value = ensure_success("duffel", response).await?.json().await?;
        info!("Duffel offer request created");
        Ok(data)
    }
}
