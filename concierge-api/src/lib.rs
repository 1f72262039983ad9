use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod award_search;
pub mod diagnostics;
pub mod duffel;
pub mod error;
pub mod middleware;
pub mod plaid;
pub mod redemption;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Rate limit applies to /api routes only
    let api = Router::new()
        .merge(diagnostics::routes())
        .merge(redemption::routes())
        .merge(plaid::routes())
        .merge(duffel::routes())
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::rate_limit_middleware));

    Router::new()
        .merge(api)
        .nest_service("/dev", ServeDir::new(&state.static_dir))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::circuit_breaker_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
