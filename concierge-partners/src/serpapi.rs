use crate::{ensure_success, PartnerResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

/// Indicative cash fares for a route.
#[async_trait]
pub trait CashFareSource: Send + Sync {
    /// Lowest listed one-way fare in USD, `None` when nothing is priced.
    async fn cash_fare(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        travel_class: u8,
    ) -> PartnerResult<Option<f64>>;
}

#[derive(Clone)]
pub struct SerpApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SerpApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }
}

/// "$1,234" or 1234 -> 1234.0
fn parse_price(raw: &Value) -> Option<f64> {
    let price = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
            digits.parse().ok()?
        }
        _ => return None,
    };
    (price.is_finite() && price > 0.0).then_some(price)
}

pub(crate) fn best_price(body: &Value) -> Option<f64> {
    body.pointer("/best_flight/price")
        .or_else(|| body.pointer("/best_flights/0/price"))
        .and_then(parse_price)
}

#[async_trait]
impl CashFareSource for SerpApiClient {
    async fn cash_fare(
        &self,
        origin: &str,
        destination: &str,
        date: NaiveDate,
        travel_class: u8,
    ) -> PartnerResult<Option<f64>> {
        let Some(api_key) = &self.api_key else {
            warn!("SerpApi key not configured, skipping cash fare lookup");
            return Ok(None);
        };

        let date = date.to_string();
        let travel_class = travel_class.to_string();
        let response = self
            .http
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google_flights"),
                ("departure_id", origin),
                ("arrival_id", destination),
                ("outbound_date", date.as_str()),
                ("travel_class", travel_class.as_str()),
                // one-way
                ("type", "2"),
                ("currency", "USD"),
                ("api_key", api_key.as_str()),
            ])
            .send()
            .await?;

        let body: Value = ensure_success("serpapi", response).await?.json().await?;
        let price = best_price(&body);
        if price.is_none() {
            debug!("No fare returned for {}-{} {}", origin, destination, date);
        }
        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_best_price_shapes() {
        assert_eq!(best_price(&json!({ "best_flight": { "price": 657 } })), Some(657.0));
        assert_eq!(best_price(&json!({ "best_flights": [{ "price": "$1,204" }] })), Some(1204.0));
        assert_eq!(best_price(&json!({ "best_flights": [] })), None);
        assert_eq!(best_price(&json!({ "best_flight": { "price": "n/a" } })), None);
    }

    #[tokio::test]
    async fn test_missing_key_skips_lookup() {
        let client = SerpApiClient::new(reqwest::Client::new(), "http://127.0.0.1:9", Some(String::new()));
        let fare = client
            .cash_fare("DFW", "LHR", NaiveDate::from_ymd_opt(2025, 12, 5).unwrap(), 1)
            .await
            .unwrap();
        assert_eq!(fare, None);
    }
}
