use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use crate::state::AppState;

/// Per-client fixed window. Store errors fail open.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = format!("ratelimit:{}", client);

    let limits = &state.rate_limit;
    match state.sessions.check_rate_limit(&key, limits.requests, limits.window_seconds).await {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::warn!("Rate limit exceeded for {}", client);
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "rate_limited", "message": "Rate limit exceeded" })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!("Rate limit check failed, allowing request: {}", e);
            next.run(req).await
        }
    }
}
