use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Agenda, CreateAgendaRequest, DeleteResponse, UpdateAgendaRequest},
    repository::Repository,
};

/// Path segment that makes `GET /api/agenda/{id}` return the whole list.
pub const ALL_ALIAS: &str = "all";

/// Result of a single-agenda lookup. The `all` alias yields the full list.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum AgendaLookup {
    One(Agenda),
    All(Vec<Agenda>),
}

// A malformed id can never match a row, so it is reported like a missing one.
fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("agenda"))
}

pub async fn list(repo: &dyn Repository) -> Result<Vec<Agenda>, AppError> {
    repo.list_agendas().await
}

pub async fn find(repo: &dyn Repository, id: &str) -> Result<AgendaLookup, AppError> {
    if id == ALL_ALIAS {
        return list(repo).await.map(AgendaLookup::All);
    }
    let id = parse_id(id)?;
    repo.get_agenda(id)
        .await?
        .map(AgendaLookup::One)
        .ok_or(AppError::NotFound("agenda"))
}

/// create
///
/// Validates the request, then attributes the agenda to `owner` when that user
/// exists, otherwise to the default owner. Nothing is written when validation fails.
pub async fn create(
    repo: &dyn Repository,
    request: CreateAgendaRequest,
    owner: Option<Uuid>,
) -> Result<Agenda, AppError> {
    let new_agenda = request.validate()?;

    let owner_id = match owner {
        Some(id) => match repo.get_user(id).await? {
            Some(user) => user.id,
            None => {
                tracing::debug!(user_id = %id, "session user not stored, using default owner");
                repo.resolve_default_owner().await?.id
            }
        },
        None => repo.resolve_default_owner().await?.id,
    };

    let agenda = repo.insert_agenda(new_agenda, owner_id).await?;
    tracing::info!(agenda_id = %agenda.id, %owner_id, "agenda created");
    Ok(agenda)
}

/// update
///
/// Existence is checked before the body is validated, so an unknown id is a 404
/// even when the patch is invalid. Concurrent updates are last-write-wins.
pub async fn update(
    repo: &dyn Repository,
    id: &str,
    request: UpdateAgendaRequest,
) -> Result<Agenda, AppError> {
    let id = parse_id(id)?;
    let current = repo
        .get_agenda(id)
        .await?
        .ok_or(AppError::NotFound("agenda"))?;

    let merged = request.validate()?.apply(current);

    // The row can vanish between the read and the write.
    repo.update_agenda(&merged)
        .await?
        .ok_or(AppError::NotFound("agenda"))
}

pub async fn delete(repo: &dyn Repository, id: &str) -> Result<DeleteResponse, AppError> {
    let id = parse_id(id)?;
    if !repo.delete_agenda(id).await? {
        return Err(AppError::NotFound("agenda"));
    }
    tracing::info!(agenda_id = %id, "agenda deleted");
    Ok(DeleteResponse {
        message: "agenda deleted".to_string(),
    })
}
