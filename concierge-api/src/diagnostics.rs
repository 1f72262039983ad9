use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use concierge_core::{Cabin, Offer};
use concierge_partners::BulkQuery;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use crate::{error::AppError, state::AppState};

/// Award used by `/api/test-fusion` to show the cents-per-mile math.
const SAMPLE_MILES: i64 = 57_000;
const SAMPLE_TAXES_CENTS: i64 = 8_760;

#[derive(Debug, Deserialize)]
pub struct SerpQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub cabin: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkParams {
    pub sources: Option<String>,
    pub region: Option<String>,
    pub month: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/test", get(liveness))
        .route("/api/test-serp", get(test_serp))
        .route("/api/test-fusion", get(test_fusion))
        .route("/api/redemption/testBulk", get(test_bulk))
}

async fn liveness() -> Json<Value> {
    Json(json!({ "ok": true, "message": "API test route working." }))
}

/// Uncached cash fare lookup, e.g. `/api/test-serp?origin=JFK&destination=LAX&date=2025-11-05`.
async fn test_serp(State(state): State<AppState>, Query(q): Query<SerpQuery>) -> Result<Json<Value>, AppError> {
    let origin = q.origin.unwrap_or_else(|| "DFW".into()).to_ascii_uppercase();
    let destination = q.destination.unwrap_or_else(|| "LHR".into()).to_ascii_uppercase();
    let date = q.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let cabin = q.cabin.as_deref().and_then(Cabin::parse).unwrap_or_default();

    info!("Test SerpApi lookup: {} -> {} ({})", origin, destination, date);
    let cash_value = state
        .fares
        .cash_fare(&origin, &destination, date, cabin.travel_class())
        .await
        .map_err(AppError::upstream("serp_failed"))?;

    Ok(Json(json!({
        "origin": origin,
        "destination": destination,
        "departDate": date,
        "cabin": cabin,
        "cashValue": cash_value,
    })))
}

/// Live cash fare joined with a fixed sample award.
async fn test_fusion(State(state): State<AppState>, Query(q): Query<SerpQuery>) -> Result<Json<Value>, AppError> {
    let origin = q.origin.unwrap_or_else(|| "JFK".into()).to_ascii_uppercase();
    let destination = q.destination.unwrap_or_else(|| "LAX".into()).to_ascii_uppercase();
    let date = q.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let cabin = q.cabin.as_deref().and_then(Cabin::parse).unwrap_or(Cabin::Business);

    let cash_value = state
        .fares
        .cash_fare(&origin, &destination, date, cabin.travel_class())
        .await
        .map_err(AppError::upstream("fusion_failed"))?;

    let award = Offer {
        date,
        origin_airport: origin.clone(),
        destination_airport: destination.clone(),
        source: "sample".into(),
        mileage_cost: SAMPLE_MILES,
        taxes_cents: SAMPLE_TAXES_CENTS,
        remaining_seats: None,
        cash_value,
        cash_cpm: None,
    };
    let cpm = award.compute_cash_cpm();
    info!("Fusion test {} -> {}: cash {:?}, cpm {:?}", origin, destination, cash_value, cpm);

    Ok(Json(json!({
        "origin": origin,
        "destination": destination,
        "cabin": cabin,
        "cashValue": cash_value,
        "award": award,
        "cpm": cpm,
    })))
}

/// Raw Seats.aero bulk availability, e.g. `?sources=aeroplan&region=NorthAmerica-Europe&month=2025-10`.
async fn test_bulk(State(state): State<AppState>, Query(q): Query<BulkParams>) -> Result<Json<Value>, AppError> {
    let month = q.month.unwrap_or_else(|| chrono::Utc::now().format("%Y-%m").to_string());
    let query = BulkQuery {
        source: q.sources.as_deref().unwrap_or("aeroplan"),
        region: q.region.as_deref().unwrap_or("NorthAmerica-Europe"),
        month: &month,
    };

    let data = state
        .awards
        .bulk_availability(&query)
        .await
        .map_err(AppError::upstream("bulk_failed"))?;
    Ok(Json(data))
}
