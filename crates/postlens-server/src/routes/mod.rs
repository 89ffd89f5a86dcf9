//! HTTP route handlers.

pub mod analytics;
pub mod export;
pub mod posts;
pub mod upload;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let uploads_dir = state.config.data_paths.uploads.clone();

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api_routes())
        // Raw uploads (and extracted ZIP media) served for the frontend.
        .nest_service("/uploads", ServeDir::new(uploads_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(upload::routes())
        .merge(posts::routes())
        .merge(analytics::routes())
        .merge(export::routes())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to PostLens API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
