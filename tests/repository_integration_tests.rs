use chrono::{TimeZone, Utc};
use igreja_site::{
    AppError,
    models::{Ministry, NewAgenda, NewVolunteer},
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

/// Holds the database pool for tests that need a real Postgres.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

fn new_agenda(title: &str) -> NewAgenda {
    NewAgenda {
        title: title.to_string(),
        description: Some("Integration".to_string()),
        date: Utc.with_ymd_and_hms(2030, 1, 1, 10, 0, 0).unwrap(),
        image: None,
    }
}

fn unique_volunteer() -> NewVolunteer {
    NewVolunteer {
        name: "Integration Volunteer".to_string(),
        email: format!("{}@test.igreja.org", Uuid::new_v4()),
        phone: "(11) 98765-4321".to_string(),
        baptized: true,
        ministry: Ministry::Slide,
    }
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_default_owner_is_stable() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let first = repo.resolve_default_owner().await.unwrap();
    let second = repo.resolve_default_owner().await.unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_agenda_crud_round_trip() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo.resolve_default_owner().await.unwrap();

    let created = repo
        .insert_agenda(new_agenda("Repository test"), owner.id)
        .await
        .unwrap();
    assert_eq!(created.owner_id, owner.id);

    let fetched = repo.get_agenda(created.id).await.unwrap().unwrap();
    assert_eq!(fetched.title, "Repository test");
    assert_eq!(fetched.date, created.date);

    let mut changed = fetched.clone();
    changed.description = None;
    let updated = repo.update_agenda(&changed).await.unwrap().unwrap();
    assert_eq!(updated.description, None);
    assert!(updated.updated_at >= fetched.updated_at);

    assert!(repo.list_agendas().await.unwrap().iter().any(|a| a.id == created.id));

    assert!(repo.delete_agenda(created.id).await.unwrap());
    assert!(!repo.delete_agenda(created.id).await.unwrap());
    assert!(repo.get_agenda(created.id).await.unwrap().is_none());
    assert!(repo.update_agenda(&changed).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running Postgres (DATABASE_URL)"]
async fn test_unique_violation_maps_to_duplicate_email() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let volunteer = unique_volunteer();

    let stored = repo.insert_volunteer(volunteer.clone()).await.unwrap();
    assert_eq!(stored.ministry, Ministry::Slide);
    assert_eq!(
        repo.find_volunteer_by_email(&volunteer.email)
            .await
            .unwrap()
            .map(|v| v.id),
        Some(stored.id)
    );

    let err = repo.insert_volunteer(volunteer).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateEmail));
}
