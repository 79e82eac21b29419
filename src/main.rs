// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::session::SupervisorSession;
use crate::infrastructure::config::load_supervisor_config;
use crate::infrastructure::http_backend::HttpControlBackend;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tank_supervisor=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_supervisor_config()?;

    // Create backend adapter (infrastructure layer)
    let backend = Arc::new(HttpControlBackend::new(
        config.backend.base_url.clone(),
        config.backend.request_timeout(),
    )?);
    tracing::info!(base_url = %config.backend.base_url, "using control backend");

    // Create session (application layer) and start polling
    let session = Arc::new(SupervisorSession::new(backend, config.poll.to_settings()));
    session.start();

    let state = Arc::new(AppState {
        session: session.clone(),
    });

    // Build router (presentation layer)
    let app = router(state);

    // Start server
    let addr: SocketAddr = config.server.bind_addr.parse()?;
    tracing::info!(%addr, "starting tank-supervisor");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    session.stop();
    Ok(())
}
