use anyhow::Context;
use std::net::SocketAddr;
use concierge_api::{app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "concierge_api=debug,concierge_partners=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = concierge_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!("Starting ConciergeSync on port {}", config.server.port);
    tracing::info!("SerpApi key detected: {}", config.serpapi.api_key.is_some());

    let app_state = AppState::from_config(&config).await?;
    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
