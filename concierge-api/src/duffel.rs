use axum::{extract::State, routing::post, Json, Router};
use chrono::NaiveDate;
use concierge_core::Cabin;
use concierge_partners::duffel::{one_way_request, MAX_PASSENGERS};
use serde::Deserialize;
use serde_json::Value;
use crate::{error::AppError, state::AppState};

/// Either a full Duffel document (`{"data": {...}}`) or a one-way shorthand.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OfferRequestBody {
    Document { data: Value },
    OneWay {
        origin: String,
        destination: String,
        departure_date: NaiveDate,
        #[serde(default)]
        cabin: Option<String>,
        #[serde(default)]
        passengers: Option<u32>,
    },
}

impl OfferRequestBody {
    fn into_document(self) -> Result<Value, AppError> {
        match self {
            OfferRequestBody::Document { data } => Ok(serde_json::json!({ "data": data })),
            OfferRequestBody::OneWay { origin, destination, departure_date, cabin, passengers } => {
                let passengers = passengers.unwrap_or(1);
                if !(1..=MAX_PASSENGERS).contains(&passengers) {
                    return Err(AppError::bad_request(
                        "invalid_parameters",
                        format!("passengers must be between 1 and {}", MAX_PASSENGERS),
                    ));
                }
                let cabin = cabin.as_deref().and_then(Cabin::parse).unwrap_or_default();
                Ok(one_way_request(&origin, &destination, departure_date, cabin, passengers))
            }
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/duffel/offer-requests", post(create_offer_request))
}

async fn create_offer_request(
    State(state): State<AppState>,
    Json(body): Json<OfferRequestBody>,
) -> Result<Json<Value>, AppError> {
    let document = body.into_document()?;
    let data = state
        .duffel
        .create_offer_request(&document)
        .await
        .map_err(AppError::upstream("duffel_failed"))?;
    Ok(Json(data))
}
