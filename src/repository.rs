use crate::error::AppError;
use crate::models::{Agenda, Ministry, NewAgenda, NewVolunteer, User, Volunteer};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Name and email of the placeholder owner created when an agenda is added
/// before any user exists. The email is unique, which makes the bootstrap idempotent.
pub const DEFAULT_OWNER_NAME: &str = "Default User";
pub const DEFAULT_OWNER_EMAIL: &str = "default@example.com";

/// Repository Trait
///
/// The persistence contract. Handlers and the agenda/volunteer rules only talk
/// to this trait, so the Postgres store can be swapped for the in-memory one in
/// tests.
///
/// **Send + Sync + async_trait** are required to share `Arc<dyn Repository>`
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Agendas ---
    // All agendas, earliest date first.
    async fn list_agendas(&self) -> Result<Vec<Agenda>, AppError>;
    async fn get_agenda(&self, id: Uuid) -> Result<Option<Agenda>, AppError>;
    async fn insert_agenda(&self, agenda: NewAgenda, owner_id: Uuid) -> Result<Agenda, AppError>;
    // Overwrites the editable fields of the stored row with those of `agenda`
    // and bumps `updated_at`. `None` if the row no longer exists.
    async fn update_agenda(&self, agenda: &Agenda) -> Result<Option<Agenda>, AppError>;
    // Hard delete. Returns true if a row was removed.
    async fn delete_agenda(&self, id: Uuid) -> Result<bool, AppError>;

    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    // The first existing user, or the placeholder owner created on demand.
    async fn resolve_default_owner(&self) -> Result<User, AppError>;

    // --- Volunteers ---
    async fn find_volunteer_by_email(&self, email: &str) -> Result<Option<Volunteer>, AppError>;
    // Fails with `DuplicateEmail` if the unique email index rejects the row.
    async fn insert_volunteer(&self, volunteer: NewVolunteer) -> Result<Volunteer, AppError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const AGENDA_COLUMNS: &str =
    "id, title, description, date, image, owner_id, created_at, updated_at";

/// Row shape of the `volunteers` table; `ministry` is stored as text.
#[derive(FromRow)]
struct VolunteerRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    baptized: bool,
    ministry: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<VolunteerRow> for Volunteer {
    type Error = AppError;

    fn try_from(row: VolunteerRow) -> Result<Self, Self::Error> {
        let ministry = row
            .ministry
            .parse::<Ministry>()
            .map_err(|e| AppError::Storage(format!("corrupt ministry in volunteers row: {}", e.0)))?;
        Ok(Volunteer {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            baptized: row.baptized,
            ministry,
            created_at: row.created_at,
        })
    }
}

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_agendas(&self) -> Result<Vec<Agenda>, AppError> {
        let query = format!("SELECT {AGENDA_COLUMNS} FROM agendas ORDER BY date ASC");
        let agendas = sqlx::query_as::<_, Agenda>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(agendas)
    }

    async fn get_agenda(&self, id: Uuid) -> Result<Option<Agenda>, AppError> {
        let query = format!("SELECT {AGENDA_COLUMNS} FROM agendas WHERE id = $1");
        let agenda = sqlx::query_as::<_, Agenda>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(agenda)
    }

    async fn insert_agenda(&self, agenda: NewAgenda, owner_id: Uuid) -> Result<Agenda, AppError> {
        let query = format!(
            "INSERT INTO agendas (id, title, description, date, image, owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW()) \
             RETURNING {AGENDA_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Agenda>(&query)
            .bind(Uuid::new_v4())
            .bind(agenda.title)
            .bind(agenda.description)
            .bind(agenda.date)
            .bind(agenda.image)
            .bind(owner_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update_agenda(&self, agenda: &Agenda) -> Result<Option<Agenda>, AppError> {
        let query = format!(
            "UPDATE agendas \
             SET title = $2, description = $3, date = $4, image = $5, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {AGENDA_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Agenda>(&query)
            .bind(agenda.id)
            .bind(&agenda.title)
            .bind(&agenda.description)
            .bind(agenda.date)
            .bind(&agenda.image)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn delete_agenda(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM agendas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// resolve_default_owner
    ///
    /// Prefers any existing user. Otherwise inserts the placeholder owner; the
    /// `ON CONFLICT` upsert lets two concurrent first-time calls converge on the
    /// same row instead of failing.
    async fn resolve_default_owner(&self) -> Result<User, AppError> {
        let existing = sqlx::query_as::<_, User>(
            "SELECT id, name, email FROM users ORDER BY created_at ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        if let Some(user) = existing {
            return Ok(user);
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email) VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, name, email
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(DEFAULT_OWNER_NAME)
        .bind(DEFAULT_OWNER_EMAIL)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(user_id = %user.id, "created default agenda owner");
        Ok(user)
    }

    async fn find_volunteer_by_email(&self, email: &str) -> Result<Option<Volunteer>, AppError> {
        let row = sqlx::query_as::<_, VolunteerRow>(
            "SELECT id, name, email, phone, baptized, ministry, created_at FROM volunteers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Volunteer::try_from).transpose()
    }

    async fn insert_volunteer(&self, volunteer: NewVolunteer) -> Result<Volunteer, AppError> {
        let result = sqlx::query_as::<_, VolunteerRow>(
            r#"
            INSERT INTO volunteers (id, name, email, phone, baptized, ministry, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id, name, email, phone, baptized, ministry, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(volunteer.name)
        .bind(volunteer.email)
        .bind(volunteer.phone)
        .bind(volunteer.baptized)
        .bind(volunteer.ministry.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => row.try_into(),
            Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }
}

// --- In-memory implementation (tests and local experiments) ---

#[derive(Default)]
struct MemoryTables {
    users: Vec<User>,
    agendas: Vec<Agenda>,
    volunteers: Vec<Volunteer>,
}

/// MemoryRepository
///
/// A `Repository` held in process memory with the same semantics as the
/// Postgres store (ordering, unique emails, placeholder owner). Used to test
/// handlers and rules without a database.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<MemoryTables>,
    /// When true, every operation fails with a storage error.
    pub should_fail: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Seeds a user, as the auth provider would on first sign-in.
    pub fn with_user(self, user: User) -> Self {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .users
            .push(user);
        self
    }

    pub fn agenda_count(&self) -> usize {
        self.lock().map(|t| t.agendas.len()).unwrap_or(0)
    }

    pub fn volunteer_count(&self) -> usize {
        self.lock().map(|t| t.volunteers.len()).unwrap_or(0)
    }

    pub fn user_count(&self) -> usize {
        self.lock().map(|t| t.users.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryTables>, AppError> {
        if self.should_fail {
            return Err(AppError::Storage("memory repository: simulated failure".to_string()));
        }
        Ok(self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_agendas(&self) -> Result<Vec<Agenda>, AppError> {
        let mut agendas = self.lock()?.agendas.clone();
        agendas.sort_by_key(|a| a.date);
        Ok(agendas)
    }

    async fn get_agenda(&self, id: Uuid) -> Result<Option<Agenda>, AppError> {
        Ok(self.lock()?.agendas.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_agenda(&self, agenda: NewAgenda, owner_id: Uuid) -> Result<Agenda, AppError> {
        let now = Utc::now();
        let created = Agenda {
            id: Uuid::new_v4(),
            title: agenda.title,
            description: agenda.description,
            date: agenda.date,
            image: agenda.image,
            owner_id,
            created_at: now,
            updated_at: now,
        };
        self.lock()?.agendas.push(created.clone());
        Ok(created)
    }

    async fn update_agenda(&self, agenda: &Agenda) -> Result<Option<Agenda>, AppError> {
        let mut tables = self.lock()?;
        let Some(stored) = tables.agendas.iter_mut().find(|a| a.id == agenda.id) else {
            return Ok(None);
        };
        stored.title = agenda.title.clone();
        stored.description = agenda.description.clone();
        stored.date = agenda.date;
        stored.image = agenda.image.clone();
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn delete_agenda(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        let before = tables.agendas.len();
        tables.agendas.retain(|a| a.id != id);
        Ok(tables.agendas.len() < before)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn resolve_default_owner(&self) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        if let Some(user) = tables.users.first() {
            return Ok(user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            name: Some(DEFAULT_OWNER_NAME.to_string()),
            email: DEFAULT_OWNER_EMAIL.to_string(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_volunteer_by_email(&self, email: &str) -> Result<Option<Volunteer>, AppError> {
        Ok(self
            .lock()?
            .volunteers
            .iter()
            .find(|v| v.email == email)
            .cloned())
    }

    async fn insert_volunteer(&self, volunteer: NewVolunteer) -> Result<Volunteer, AppError> {
        let mut tables = self.lock()?;
        if tables.volunteers.iter().any(|v| v.email == volunteer.email) {
            return Err(AppError::DuplicateEmail);
        }
        let created = Volunteer {
            id: Uuid::new_v4(),
            name: volunteer.name,
            email: volunteer.email,
            phone: volunteer.phone,
            baptized: volunteer.baptized,
            ministry: volunteer.ministry,
            created_at: Utc::now(),
        };
        tables.volunteers.push(created.clone());
        Ok(created)
    }
}
