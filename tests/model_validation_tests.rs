use chrono::{TimeZone, Utc};
use igreja_site::models::{
    Agenda, AgendaPatch, CreateVolunteerRequest, Ministry, Patch, SessionResponse,
    UpdateAgendaRequest, parse_timestamp,
};
use serde_json::json;
use uuid::Uuid;

// --- Timestamps ---

#[test]
fn test_parse_timestamp_formats() {
    let ten_utc = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();

    assert_eq!(parse_timestamp("2025-01-01T10:00:00Z"), Some(ten_utc));
    assert_eq!(parse_timestamp("2025-01-01T07:00:00-03:00"), Some(ten_utc));
    assert_eq!(parse_timestamp("2025-01-01T10:00:00.000Z"), Some(ten_utc));
    // `datetime-local` input values carry no offset and are read as UTC.
    assert_eq!(parse_timestamp("2025-01-01T10:00"), Some(ten_utc));
    assert_eq!(parse_timestamp("2025-01-01T10:00:00"), Some(ten_utc));
    assert_eq!(
        parse_timestamp("2025-01-01"),
        Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_parse_timestamp_rejects_garbage() {
    for raw in ["", "tomorrow", "01/01/2025", "2025-13-01", "2025-01-01T25:00"] {
        assert_eq!(parse_timestamp(raw), None, "{raw}");
    }
}

// --- Patch deserialization ---

#[test]
fn test_patch_distinguishes_missing_null_and_value() {
    let req: UpdateAgendaRequest = serde_json::from_value(json!({
        "description": null,
        "title": "Vigília"
    }))
    .unwrap();

    assert_eq!(req.title, Patch::Value("Vigília".to_string()));
    assert_eq!(req.description, Patch::Null);
    assert_eq!(req.date, Patch::Missing);
    assert_eq!(req.image, Patch::Missing);
}

#[test]
fn test_empty_patch_changes_nothing() {
    let req: UpdateAgendaRequest = serde_json::from_value(json!({})).unwrap();

    assert_eq!(req.validate().unwrap(), AgendaPatch::default());
}

#[test]
fn test_patch_apply_overlays_supplied_fields() {
    let now = Utc::now();
    let agenda = Agenda {
        id: Uuid::new_v4(),
        title: "Culto".to_string(),
        description: Some("Domingo".to_string()),
        date: now,
        image: Some("/uploads/a.png".to_string()),
        owner_id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    };
    let patch = AgendaPatch {
        title: Some("Culto de ceia".to_string()),
        image: Some(None),
        ..AgendaPatch::default()
    };

    let merged = patch.apply(agenda.clone());

    assert_eq!(merged.title, "Culto de ceia");
    assert_eq!(merged.image, None);
    assert_eq!(merged.description, agenda.description);
    assert_eq!(merged.date, agenda.date);
    assert_eq!(merged.id, agenda.id);
}

// --- Ministry ---

#[test]
fn test_ministry_wire_names() {
    assert_eq!("techinicalsuporte".parse::<Ministry>(), Ok(Ministry::TechnicalSupport));
    assert_eq!("geralmidia".parse::<Ministry>(), Ok(Ministry::GeneralMedia));
    assert!("TechnicalSupport".parse::<Ministry>().is_err());

    for ministry in Ministry::ALL {
        let wire = serde_json::to_value(ministry).unwrap();
        assert_eq!(wire, json!(ministry.as_str()));
        assert_eq!(ministry.to_string(), ministry.as_str());
    }
}

// --- Volunteer validation edge cases ---

#[test]
fn test_volunteer_phone_length_boundary() {
    let base = CreateVolunteerRequest {
        name: Some("Ana".to_string()),
        email: Some("ana@igreja.org".to_string()),
        phone: None,
        baptized: Some(true),
        ministry: Some("kidschurch".to_string()),
    };

    let accepted = CreateVolunteerRequest {
        phone: Some("(11) 9876-5432".to_string()),
        ..base.clone()
    };
    assert!(accepted.validate().is_ok());

    let rejected = CreateVolunteerRequest {
        phone: Some("(11) 9876-543".to_string()),
        ..base
    };
    assert!(rejected.validate().is_err());
}

#[test]
fn test_volunteer_email_format() {
    for (email, ok) in [
        ("ana@igreja.org", true),
        ("ana.maria+coral@igreja.com.br", true),
        ("ana@igreja", false),
        ("ana igreja@x.org", false),
        ("@igreja.org", false),
    ] {
        let req = CreateVolunteerRequest {
            name: Some("Ana".to_string()),
            email: Some(email.to_string()),
            phone: Some("(11) 98765-4321".to_string()),
            baptized: Some(false),
            ministry: Some("sound".to_string()),
        };
        assert_eq!(req.validate().is_ok(), ok, "{email}");
    }
}

// --- Serialization shape ---

#[test]
fn test_agenda_serializes_in_camel_case() {
    let now = Utc::now();
    let agenda = Agenda {
        id: Uuid::new_v4(),
        title: "Culto".to_string(),
        description: None,
        date: now,
        image: None,
        owner_id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    };

    let value = serde_json::to_value(&agenda).unwrap();

    for key in ["id", "title", "description", "date", "image", "ownerId", "createdAt", "updatedAt"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert!(value.get("owner_id").is_none());
}

#[test]
fn test_anonymous_session_response_omits_user() {
    let body = SessionResponse {
        authenticated: false,
        user: None,
    };

    assert_eq!(
        serde_json::to_value(body).unwrap(),
        json!({ "authenticated": false })
    );
}
