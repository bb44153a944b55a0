//! HTTP surface
mod handlers;
mod response;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chat::ChatPipeline;
use crate::db::repo::Repo;
use crate::error::AppResult;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
    pub repo: Arc<Repo>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(handlers::chat))
        .route(
            "/api/chat/messages",
            get(handlers::list_messages).delete(handlers::delete_messages),
        )
        .route("/api/chat/messages/all", delete(handlers::clear_messages))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl+C
pub async fn serve(listener: TcpListener, state: AppState) -> AppResult<()> {
    info!("🌐 Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        // Without a signal handler, keep serving
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down...");
}
