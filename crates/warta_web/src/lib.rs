use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/scrape", post(handlers::scrape))
        .route("/sources", get(handlers::list_sources))
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Serves the API on `addr` until `shutdown` fires.
pub async fn serve(addr: SocketAddr, state: AppState, shutdown: CancellationToken) -> warta_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "🌍 API listening");

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("API stopped");
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use warta_core::{Article, Error, Result};
}
