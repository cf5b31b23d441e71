use crate::{
    AppState, agendas,
    agendas::AgendaLookup,
    auth::SessionUser,
    error::{AppError, ErrorBody},
    models::{
        Agenda, CreateAgendaRequest, CreateVolunteerRequest, DeleteResponse, ImageListResponse,
        SessionResponse, UpdateAgendaRequest, UploadResponse, Volunteer,
    },
    volunteers,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, State, multipart::MultipartRejection, rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Name of the multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

// --- Agenda Handlers ---

/// list_agendas
///
/// [Public Route] Every agenda entry, earliest date first.
#[utoipa::path(
    get,
    path = "/api/agenda",
    responses(
        (status = 200, description = "Agenda list", body = [Agenda]),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn list_agendas(State(state): State<AppState>) -> Result<Json<Vec<Agenda>>, AppError> {
    let agendas = agendas::list(state.repo.as_ref()).await?;
    Ok(Json(agendas))
}

/// create_agenda
///
/// [Public Route] Creates an agenda entry. A signed-in caller becomes its owner;
/// anonymous requests are attributed to the default owner.
#[utoipa::path(
    post,
    path = "/api/agenda",
    request_body = CreateAgendaRequest,
    responses(
        (status = 201, description = "Agenda created", body = Agenda),
        (status = 400, description = "Invalid data", body = ErrorBody)
    )
)]
pub async fn create_agenda(
    State(state): State<AppState>,
    session: Option<SessionUser>,
    payload: Result<Json<CreateAgendaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Agenda>), AppError> {
    let Json(request) = payload?;
    let owner = session.map(|user| user.id);
    let agenda = agendas::create(state.repo.as_ref(), request, owner).await?;
    Ok((StatusCode::CREATED, Json(agenda)))
}

/// get_agenda
///
/// [Public Route] One agenda entry. `all` in place of the id returns the list.
#[utoipa::path(
    get,
    path = "/api/agenda/{id}",
    params(("id" = String, Path, description = "Agenda id, or `all`")),
    responses(
        (status = 200, description = "Agenda, or the list for `all`", body = AgendaLookup),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn get_agenda(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgendaLookup>, AppError> {
    let found = agendas::find(state.repo.as_ref(), &id).await?;
    Ok(Json(found))
}

/// update_agenda
///
/// [Public Route] Partial update. Omitted fields are kept.
#[utoipa::path(
    patch,
    path = "/api/agenda/{id}",
    params(("id" = String, Path, description = "Agenda id")),
    request_body = UpdateAgendaRequest,
    responses(
        (status = 200, description = "Updated agenda", body = Agenda),
        (status = 400, description = "Invalid data", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn update_agenda(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAgendaRequest>, JsonRejection>,
) -> Result<Json<Agenda>, AppError> {
    // An unknown id wins over a malformed body.
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            agendas::find(state.repo.as_ref(), &id).await?;
            return Err(rejection.into());
        }
    };
    let agenda = agendas::update(state.repo.as_ref(), &id, request).await?;
    Ok(Json(agenda))
}

/// delete_agenda
///
/// [Public Route] Permanently removes an agenda entry.
#[utoipa::path(
    delete,
    path = "/api/agenda/{id}",
    params(("id" = String, Path, description = "Agenda id")),
    responses(
        (status = 200, description = "Deleted", body = DeleteResponse),
        (status = 404, description = "Not found", body = ErrorBody)
    )
)]
pub async fn delete_agenda(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let ack = agendas::delete(state.repo.as_ref(), &id).await?;
    Ok(Json(ack))
}

// --- Volunteer Handlers ---

/// create_volunteer
///
/// [Public Route] Volunteer sign-up form.
#[utoipa::path(
    post,
    path = "/api/volunteers",
    request_body = CreateVolunteerRequest,
    responses(
        (status = 201, description = "Volunteer registered", body = Volunteer),
        (status = 400, description = "Invalid data or email already registered", body = ErrorBody)
    )
)]
pub async fn create_volunteer(
    State(state): State<AppState>,
    payload: Result<Json<CreateVolunteerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Volunteer>), AppError> {
    let Json(request) = payload?;
    let volunteer = volunteers::register(state.repo.as_ref(), request).await?;
    Ok((StatusCode::CREATED, Json(volunteer)))
}

// --- Image Handlers ---

/// upload_image
///
/// [Public Route] Stores the multipart field `file` and returns its public URL.
/// The MIME type is taken from the part's own `Content-Type`.
#[utoipa::path(
    post,
    path = "/api/upload",
    request_body(content_type = "multipart/form-data", description = "Multipart form with a `file` field"),
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing file or unsupported type", body = ErrorBody)
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut multipart = multipart.map_err(|e| AppError::invalid("file", e.body_text()))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::invalid("file", e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::invalid("file", e.body_text()))?;

        let url = state.storage.put(bytes, &mime).await?;
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse { url, success: true }),
        ));
    }

    Err(AppError::invalid("file", "no file uploaded"))
}

/// list_images
///
/// [Public Route] Every previously uploaded image.
#[utoipa::path(
    get,
    path = "/api/images",
    responses(
        (status = 200, description = "Image URLs", body = ImageListResponse),
        (status = 500, description = "Storage failure", body = ErrorBody)
    )
)]
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<ImageListResponse>, AppError> {
    let images = state.storage.list().await?;
    Ok(Json(ImageListResponse {
        images,
        success: true,
    }))
}

// --- Session ---

/// get_session
///
/// Reports whether the request carries a valid session cookie.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "No valid session", body = SessionResponse)
    )
)]
pub async fn get_session(session: Option<SessionUser>) -> Response {
    match session {
        Some(user) => (
            StatusCode::OK,
            Json(SessionResponse {
                authenticated: true,
                user: Some(user.into()),
            }),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(SessionResponse {
                authenticated: false,
                user: None,
            }),
        )
            .into_response(),
    }
}
