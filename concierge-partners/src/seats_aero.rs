use crate::{ensure_success, PartnerError, PartnerResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use concierge_core::{Cabin, Offer};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

pub const MAX_MILES: i64 = 500_000;

// ============================================================================
// Availability Records
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Route {
    #[serde(default)]
    pub origin_airport: String,
    #[serde(default)]
    pub destination_airport: String,
}

/// One cached availability row. Cabin-specific fields (`YMileageCost`,
/// `JTotalTaxes`, `FRemainingSeats`, ...) are kept as raw values since the
/// partner sends some numbers as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AvailabilityRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub route: Route,
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<AvailabilityRecord>,
}

/// Cost of one cabin on one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CabinFare {
    pub miles: i64,
    pub taxes_cents: i64,
    pub seats: Option<i64>,
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i64),
        _ => None,
    }
}

impl AvailabilityRecord {
    fn number(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(as_i64)
    }

    pub fn cabin_fare(&self, cabin: Cabin) -> CabinFare {
        let prefix = cabin.availability_prefix();
        let miles = self.number(&format!("{}MileageCost", prefix)).unwrap_or(0);
        let taxes_cents = self
            .number(&format!("{}TotalTaxes", prefix))
            .or_else(|| self.number("TotalTaxes"))
            .unwrap_or(0);
        let seats = self
            .number(&format!("{}RemainingSeats", prefix))
            .filter(|s| *s > 0);
        CabinFare { miles, taxes_cents, seats }
    }

    /// Drops rows with no usable price in the requested cabin.
    pub fn passes_sanity(&self, cabin: Cabin) -> bool {
        let fare = self.cabin_fare(cabin);
        fare.miles > 0 && fare.miles <= MAX_MILES && fare.taxes_cents >= 0
    }

    pub fn to_offer(&self, cabin: Cabin, origin: &str, destination: &str) -> Offer {
        let fare = self.cabin_fare(cabin);
        let pick = |reported: &str, requested: &str| {
            if reported.is_empty() { requested.to_string() } else { reported.to_string() }
        };
        Offer {
            date: self.date,
            origin_airport: pick(&self.route.origin_airport, origin),
            destination_airport: pick(&self.route.destination_airport, destination),
            source: self.source.clone(),
            mileage_cost: fare.miles,
            taxes_cents: fare.taxes_cents,
            remaining_seats: fare.seats,
            cash_value: None,
            cash_cpm: None,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct DayQuery<'a> {
    pub origin: &'a str,
    pub destination: &'a str,
    pub day: NaiveDate,
    pub take: u32,
    pub direct_only: bool,
}

/// Month-wide availability for one program and region, e.g. `aeroplan`,
/// `NorthAmerica-Europe`, `2025-10`.
#[derive(Debug, Clone)]
pub struct BulkQuery<'a> {
    pub source: &'a str,
    pub region: &'a str,
    pub month: &'a str,
}

#[async_trait]
pub trait AwardAvailability: Send + Sync {
    async fn search_day(&self, query: &DayQuery<'_>) -> PartnerResult<Vec<AvailabilityRecord>>;

    /// Raw `/bulk-availability` document.
    async fn bulk_availability(&self, query: &BulkQuery<'_>) -> PartnerResult<Value>;
}

#[derive(Clone)]
pub struct SeatsAeroClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SeatsAeroClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl AwardAvailability for SeatsAeroClient {
    async fn search_day(&self, query: &DayQuery<'_>) -> PartnerResult<Vec<AvailabilityRecord>> {
        if self.api_key.is_empty() {
            return Err(PartnerError::MissingCredentials("seats_aero.api_key"));
        }

        let day = query.day.to_string();
        let take = query.take.to_string();
        let url = format!("{}/search", self.base_url);
        debug!("Seats.aero search {} -> {} on {}", query.origin, query.destination, day);

        let response = self
            .http
            .get(&url)
            .header("Partner-Authorization", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("origin_airport", query.origin),
                ("destination_airport", query.destination),
                ("start_date", day.as_str()),
                ("end_date", day.as_str()),
                ("take", take.as_str()),
                ("include_trips", "false"),
                ("only_direct_flights", if query.direct_only { "true" } else { "false" }),
                ("include_filtered", "false"),
            ])
            .send()
            .await?;

        let body: SearchResponse = ensure_success("seats.aero", response).await?.json().await?;
        info!("Seats.aero returned {} records for {}", body.data.len(), day);
        Ok(body.data)
    }

    async fn bulk_availability(&self, query: &BulkQuery<'_>) -> PartnerResult<Value> {
        if self.api_key.is_empty() {
            return Err(PartnerError::MissingCredentials("seats_aero.api_key"));
        }

        let url = format!("{}/bulk-availability", self.base_url);
        info!("Seats.aero bulk request: {} {} {}", query.source, query.region, query.month);

        let response = self
            .http
            .get(&url)
            .header("Partner-Authorization", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("sources", query.source), ("region", query.region), ("month", query.month)])
            .send()
            .await?;

        Ok(ensure_success("seats.aero", response).await?.json().await?)
    }
}
