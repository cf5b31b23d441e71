use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use std::{path::Path, sync::Arc};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod agendas;
pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;
pub mod volunteers;

// Module for routing segregation (API, Site).
pub mod routes;
use gate::{AccessGate, access_gate};
use routes::{api, site};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use auth::{SessionState, SessionVerifier};
pub use config::AppConfig;
pub use error::AppError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{LocalUploadStore, MockUploadStore, StorageState};

/// ApiDoc
///
/// Auto-generates the OpenAPI document for every `/api` endpoint, served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_agendas, handlers::create_agenda, handlers::get_agenda,
        handlers::update_agenda, handlers::delete_agenda, handlers::create_volunteer,
        handlers::upload_image, handlers::list_images, handlers::get_session
    ),
    components(
        schemas(
            models::Agenda, models::CreateAgendaRequest, models::UpdateAgendaRequest,
            models::Volunteer, models::CreateVolunteerRequest, models::Ministry,
            models::DeleteResponse, models::UploadResponse, models::ImageListResponse,
            models::SessionResponse, models::SessionInfo, agendas::AgendaLookup,
            error::ErrorBody, error::FieldError,
        )
    ),
    tags(
        (name = "igreja-site", description = "Church site API: agenda, volunteers and images")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: the single, immutable container of
/// every service the handlers need, shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: agendas, users and volunteers.
    pub repo: RepositoryState,
    /// Storage Layer: uploaded images.
    pub storage: StorageState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
    /// Session cookie verification, shared with the access gate.
    pub sessions: SessionState,
}

// --- Axum FromRef Extractor Implementations ---

// Let handlers and extractors pull individual components out of AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

/// create_router
///
/// Assembles the whole application: API, documentation, uploads and the static
/// site, all behind the access gate, then wrapped in the observability layers.
pub fn create_router(state: AppState) -> Router {
    let gate = Arc::new(AccessGate::new(&state.config, state.sessions.clone()));
    let site_files = ServeDir::new(&state.config.public_dir).append_index_html_on_directories(true);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 1. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api::api_routes(state.config.max_upload_bytes))
        .merge(site::site_routes(Path::new(&state.config.upload_dir)))
        // Static Site: every other path is looked up in the public directory.
        .fallback_service(site_files)
        // 2. Access Gate: redirects and CORS for everything declared above,
        // fallback included.
        .layer(middleware::from_fn_with_state(gate, access_gate))
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router.layer(
        ServiceBuilder::new()
            // 3a. Request ID Generation: a UUID for every incoming request.
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            // 3b. Request Tracing: one span per request, carrying the request id.
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            // 3c. Request ID Propagation: echo x-request-id back to the client.
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
}

/// trace_span_logger
///
/// Used by `TraceLayer` to open the request span with the method, URI and the
/// `x-request-id` header, so every log line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
