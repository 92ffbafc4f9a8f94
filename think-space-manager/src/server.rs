use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use think_space_agent::CompletionRelay;
use think_space_core::config::Config;
use think_space_core::session::{RetentionPolicy, SessionManager};

use crate::handlers::{brainstorm_handler, clear_session_handler, health_handler, test_handler};
use crate::state::AppState;
use crate::sweeper::spawn_session_sweeper;

/// Build the HTTP routes.
///
/// CORS is fully open; tighten before exposing beyond a prototype.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/test", get(test_handler))
        .route("/brainstorm", post(brainstorm_handler))
        .route("/clear-session", post(clear_session_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = build_router(state);

    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("Server shutting down signal received");
        })
        .await?;

    Ok(())
}

/// Wire the session store, relay, sweeper and HTTP server from configuration
/// and run until Ctrl-C.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let sessions = Arc::new(SessionManager::with_policy(RetentionPolicy::from(
        &config.sessions,
    )));
    let relay = Arc::new(CompletionRelay::from_config(
        &config.provider,
        sessions.clone(),
    ));
    let state = AppState::new(relay);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let sweeper = spawn_session_sweeper(
        sessions,
        Duration::from_secs(config.sessions.sweep_interval_secs),
        shutdown_tx.subscribe(),
    );

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        let _ = signal_tx.send(());
    });

    let result = run_server(state, addr, shutdown_rx).await;
    let _ = shutdown_tx.send(());
    let _ = sweeper.await;
    result
}
