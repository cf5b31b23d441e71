use crate::{
    error::AppError,
    models::{CreateVolunteerRequest, Volunteer},
    repository::Repository,
};

/// register
///
/// Validates and stores a volunteer sign-up. Concurrent sign-ups that race past
/// the email lookup are still rejected by the unique index, which the repository
/// reports as the same `DuplicateEmail`.
pub async fn register(
    repo: &dyn Repository,
    request: CreateVolunteerRequest,
) -> Result<Volunteer, AppError> {
    let new_volunteer = request.validate()?;

    if repo
        .find_volunteer_by_email(&new_volunteer.email)
        .await?
        .is_some()
    {
        tracing::info!(email = %new_volunteer.email, "volunteer email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let volunteer = repo.insert_volunteer(new_volunteer).await?;
    tracing::info!(volunteer_id = %volunteer.id, ministry = %volunteer.ministry, "volunteer registered");
    Ok(volunteer)
}
