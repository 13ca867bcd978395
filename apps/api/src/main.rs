mod config;
mod errors;
mod extraction;
mod payload;
mod prompt;
mod report;
mod routes;
mod session;
mod state;
mod uploads;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::extraction::DocumentExtractor;
use crate::report::ReportClient;
use crate::routes::build_router;
use crate::session::SessionStore;
use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; a missing API key fails before anything binds.
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TalentHQ API v{}", env!("CARGO_PKG_VERSION"));

    let client = ReportClient::new(config.llm.clone())?;
    info!(
        "Report client initialized (model: {}, retries: {})",
        client.model(),
        config.llm.max_retries
    );

    let sessions = SessionStore::new(
        Arc::new(DocumentExtractor),
        Arc::new(client),
        config.report_debounce,
        config.session_idle_ttl,
    );
    let _sweeper = sessions.spawn_sweeper(config.session_idle_ttl.min(SWEEP_INTERVAL));
    info!(
        "Idle sessions expire after {}s",
        config.session_idle_ttl.as_secs()
    );

    let state = AppState {
        sessions,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
