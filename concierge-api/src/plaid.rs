use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use concierge_store::PlaidItem;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use crate::{error::AppError, state::AppState};

/// Link user id until end-user accounts exist.
const LINK_USER_ID: &str = "cs-session-user";

#[derive(Debug, Deserialize)]
pub struct Institution {
    pub institution_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    pub public_token: Option<String>,
    pub institution: Option<Institution>,
}

#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub ok: bool,
    pub plaid_item_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountsQuery {
    pub item_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/plaid/link-token", get(link_token))
        .route("/api/plaid/exchange", post(exchange))
        .route("/api/plaid/accounts", get(accounts))
}

async fn link_token(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let data = state
        .plaid
        .create_link_token(LINK_USER_ID)
        .await
        .map_err(AppError::upstream("link_token_failed"))?;
    Ok(Json(data))
}

async fn exchange(
    State(state): State<AppState>,
    Json(req): Json<ExchangeRequest>,
) -> Result<Json<ExchangeResponse>, AppError> {
    let public_token = req
        .public_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::bad_request("missing_public_token", "public_token is required."))?;

    let exchange = state
        .plaid
        .exchange_public_token(&public_token)
        .await
        .map_err(AppError::upstream("exchange_failed"))?;

    let (Some(item_id), Some(access_token)) = (exchange.item_id, exchange.access_token) else {
        return Err(AppError::bad_request(
            "invalid_exchange_response",
            "Plaid did not return an item id and access token.",
        ));
    };

    let institution = req.institution;
    let item = PlaidItem {
        plaid_item_id: item_id.clone(),
        access_token,
        institution_id: institution.as_ref().and_then(|i| i.institution_id.clone()),
        institution_name: institution.and_then(|i| i.name),
        created_at: chrono::Utc::now(),
    };
    state.plaid_items.put_item(&item).await?;
    info!("Plaid item linked: {}", item_id);

    Ok(Json(ExchangeResponse {
        ok: true,
        plaid_item_id: item_id,
    }))
}

async fn accounts(
    State(state): State<AppState>,
    Query(query): Query<AccountsQuery>,
) -> Result<Json<Value>, AppError> {
    let item_id = query
        .item_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::bad_request("missing_item_id", "item_id is required."))?;

    let access_token = state
        .plaid_items
        .access_token(&item_id)
        .await?
        .ok_or_else(|| AppError::bad_request("access_token_not_found", format!("No access token for item {}", item_id)))?;

    let data = state
        .plaid
        .accounts(&access_token)
        .await
        .map_err(AppError::upstream("accounts_failed"))?;
    Ok(Json(data))
}
