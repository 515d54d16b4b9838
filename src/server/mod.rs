//! Backend HTTP API: challenge issuance, unlock recording, progress.

mod cors;
mod error;
mod routes;

pub use error::ApiError;
pub use routes::is_uuid;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use log::info;
use tokio::net::TcpListener;

use crate::db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Wrong methods on known paths answer like unknown paths.
        .route(
            "/api/challenge",
            get(routes::get_challenge).fallback(routes::not_found),
        )
        .route(
            "/api/found",
            post(routes::post_found).fallback(routes::not_found),
        )
        .route(
            "/api/progress",
            get(routes::get_progress).fallback(routes::not_found),
        )
        .fallback(routes::not_found)
        .layer(middleware::from_fn(cors::permissive_cors))
        .with_state(state)
}

/// Serves until the listener fails or the task is dropped.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("listener has no local address")?;
    info!("Challenge API listening on http://{addr}");
    axum::serve(listener, router(state))
        .await
        .context("HTTP server terminated")
}
