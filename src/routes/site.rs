use crate::{AppState, storage::UPLOADS_URL_PREFIX};
use axum::{Router, routing::get};
use std::path::Path;
use tower_http::services::ServeDir;

/// Site Router Module
///
/// Non-API routes. The static pages themselves are the router's fallback
/// (see `create_router`), so only fixed paths are declared here.
pub fn site_routes(upload_dir: &Path) -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and monitoring.
        .route("/health", get(|| async { "ok" }))
        // GET /uploads/*
        // Images written by `POST /api/upload`.
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(upload_dir))
}
