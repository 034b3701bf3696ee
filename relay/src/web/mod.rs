//! Web server module
//!
//! HTTP surface over the chat service. The service instance is constructed
//! once at startup and shared as router state; nothing here creates or
//! initializes it lazily.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::chat::ChatService;

/// Configuration for the web server.
pub struct WebConfig {
    pub port: u16,
}

/// Build the router with all routes.
pub fn create_router(chat: Arc<ChatService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat
        .route("/chat", post(api::chat))
        .route("/chat/history/{session_id}", get(api::history))
        .route("/chat/clear/{session_id}", delete(api::clear))
        .route("/chat/status", get(api::status))
        // Tools
        .route("/tools", get(api::tools))
        .route("/tools/servers", get(api::tool_servers))
        // Health
        .route("/health", get(api::health));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(chat)
}

/// Serve until a shutdown signal arrives.
pub async fn serve(chat: Arc<ChatService>, config: WebConfig) -> Result<()> {
    let app = create_router(chat);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting web server on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
