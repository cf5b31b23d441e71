use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// API Router Module
///
/// Every endpoint lives under `/api/`, so the gate attaches CORS headers to all
/// of them and answers their preflights. None of them require a session; the
/// admin pages calling the mutating routes are what the gate protects.
pub fn api_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // GET /api/agenda, POST /api/agenda
        .route(
            "/api/agenda",
            get(handlers::list_agendas).post(handlers::create_agenda),
        )
        // GET / PATCH / DELETE /api/agenda/{id}
        // `{id}` may be `all` on GET, which returns the list.
        .route(
            "/api/agenda/{id}",
            get(handlers::get_agenda)
                .patch(handlers::update_agenda)
                .delete(handlers::delete_agenda),
        )
        // POST /api/volunteers
        .route("/api/volunteers", post(handlers::create_volunteer))
        // POST /api/upload
        // Multipart body; the default 2 MB limit is raised to the configured maximum.
        .route(
            "/api/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        // GET /api/images
        .route("/api/images", get(handlers::list_images))
        // GET /api/auth/session
        .route("/api/auth/session", get(handlers::get_session))
}
