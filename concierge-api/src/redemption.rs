use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use concierge_core::{Cabin, DateMode, SearchCriteria, SearchResult, YesNo};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;
use crate::{award_search, error::AppError, state::AppState};

// ============================================================================
// Request Types
// ============================================================================

/// Search body as sent by either front-end. Everything is optional here so
/// missing fields produce our own error codes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRequest {
    #[serde(alias = "from")]
    pub origin: Option<String>,
    #[serde(alias = "to")]
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub flex_days: Option<u32>,
    pub passengers: Option<u32>,
    pub cabin: Option<String>,
    pub program: Option<String>,
    pub mode: Option<DateMode>,
    pub direct: Option<YesNo>,
    pub multi: Option<YesNo>,
    pub positioning: Option<YesNo>,
}

fn airport_code(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_ascii_uppercase())
        .filter(|v| !v.is_empty())
}

impl RedemptionRequest {
    pub fn into_criteria(self, max_flex_days: u32) -> Result<SearchCriteria, AppError> {
        let (Some(origin), Some(destination)) = (airport_code(self.origin), airport_code(self.destination)) else {
            return Err(AppError::bad_request("missing_parameters", "Origin and destination are required."));
        };

        let cabin = match self.cabin.as_deref() {
            None | Some("") => Cabin::Economy,
            Some(raw) => Cabin::parse(raw).unwrap_or_else(|| {
                warn!("Unknown cabin '{}', searching economy", raw);
                Cabin::Economy
            }),
        };

        let requested_flex = self.flex_days.unwrap_or(0);
        if requested_flex > max_flex_days {
            warn!("flexDays {} clamped to {}", requested_flex, max_flex_days);
        }

        let criteria = SearchCriteria {
            origin,
            destination,
            date: self.date.unwrap_or_else(|| chrono::Utc::now().date_naive()),
            flex_days: requested_flex.min(max_flex_days),
            passengers: self.passengers.unwrap_or(1),
            cabin,
            program: self.program.unwrap_or_default().trim().to_string(),
            mode: self.mode.unwrap_or_default(),
            direct: self.direct.unwrap_or(YesNo::No),
            multi: self.multi.unwrap_or(YesNo::No),
            positioning: self.positioning.unwrap_or(YesNo::No),
        };

        criteria
            .validate()
            .map_err(|e| AppError::bad_request("invalid_parameters", e.to_string()))?;
        Ok(criteria)
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/redemption", post(create_search))
        .route("/api/redemption/{session_id}", get(get_session))
}

async fn create_search(
    State(state): State<AppState>,
    body: Result<Json<RedemptionRequest>, JsonRejection>,
) -> Result<Json<SearchResult>, AppError> {
    let Json(request) = body.map_err(|e| {
        warn!("Rejected redemption body: {}", e.body_text());
        AppError::bad_request("invalid_body", e.body_text())
    })?;
    info!("Received redemption payload: {:?}", request);

    let criteria = request.into_criteria(state.search.max_flex_days)?;
    let results = award_search::search(&state, &criteria).await?;

    let session_id = Uuid::new_v4().to_string();
    let session_id = match state
        .sessions
        .save_session(&session_id, &results, state.search.session_ttl_seconds)
        .await
    {
        Ok(()) => Some(session_id),
        Err(e) => {
            // without a stored session the results page falls back to local storage
            error!("Failed to store session {}: {}", session_id, e);
            None
        }
    };

    Ok(Json(SearchResult { session_id, results }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SearchResult>, AppError> {
    let results = state
        .sessions
        .load_session(&session_id)
        .await?
        .ok_or_else(|| AppError::NotFound {
            code: "session_not_found",
            message: format!("No results stored for session {}", session_id),
        })?;

    Ok(Json(SearchResult {
        session_id: Some(session_id),
        results,
    }))
}
