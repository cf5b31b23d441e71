use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, FieldError};

lazy_static! {
    /// Deliberately loose: something@something.tld, no whitespace.
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

pub const MIN_VOLUNTEER_NAME_CHARS: usize = 3;
/// Length of the shortest formatted phone accepted, e.g. `(11) 9876-5432`.
pub const MIN_PHONE_CHARS: usize = 14;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Minimal identity record. Only used as an Agenda owner and as the identity
/// behind a session; never created through a public endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: String,
}

/// Agenda
///
/// A calendar event from the `agendas` table. Serialized in camelCase for the
/// existing web clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Agenda {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub date: DateTime<Utc>,
    // Public URL of the cover image, usually `/uploads/<file>`.
    pub image: Option<String>,
    pub owner_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Ministry
///
/// The fixed set of ministries a volunteer can sign up for. Wire names are kept
/// exactly as the sign-up form sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum Ministry {
    #[serde(rename = "kidschurch")]
    KidsChurch,
    #[serde(rename = "musicteam")]
    MusicTeam,
    #[serde(rename = "techinicalsuporte")]
    TechnicalSupport,
    #[serde(rename = "sound")]
    Sound,
    #[serde(rename = "slide")]
    Slide,
    #[serde(rename = "photograph")]
    Photograph,
    #[serde(rename = "geralmidia")]
    GeneralMedia,
}

impl Ministry {
    pub const ALL: [Ministry; 7] = [
        Ministry::KidsChurch,
        Ministry::MusicTeam,
        Ministry::TechnicalSupport,
        Ministry::Sound,
        Ministry::Slide,
        Ministry::Photograph,
        Ministry::GeneralMedia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Ministry::KidsChurch => "kidschurch",
            Ministry::MusicTeam => "musicteam",
            Ministry::TechnicalSupport => "techinicalsuporte",
            Ministry::Sound => "sound",
            Ministry::Slide => "slide",
            Ministry::Photograph => "photograph",
            Ministry::GeneralMedia => "geralmidia",
        }
    }
}

impl fmt::Display for Ministry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMinistry(pub String);

impl FromStr for Ministry {
    type Err = UnknownMinistry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ministry::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMinistry(s.to_string()))
    }
}

/// Volunteer
///
/// A sign-up from the volunteers form. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Volunteer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub baptized: bool,
    pub ministry: Ministry,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// Patch
///
/// Tri-state field for partial updates: distinguishes a key that was omitted
/// from one explicitly sent as `null`. Fields using it must carry
/// `#[serde(default)]` so omission maps to `Missing`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Missing,
    Null,
    Value(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

/// CreateAgendaRequest
///
/// Body of `POST /api/agenda`. Every field is optional at the wire level so that
/// missing values surface as field errors instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateAgendaRequest {
    #[schema(example = "Culto de domingo")]
    pub title: Option<String>,
    pub description: Option<String>,
    /// ISO-8601 timestamp, e.g. `2025-01-01T10:00:00Z`.
    #[schema(example = "2025-01-01T10:00:00Z")]
    pub date: Option<String>,
    pub image: Option<String>,
}

/// Validated form of [`CreateAgendaRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewAgenda {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
}

impl CreateAgendaRequest {
    pub fn validate(self) -> Result<NewAgenda, AppError> {
        let mut errors = Vec::new();

        // Blank titles are rejected; non-blank ones are stored as sent.
        let title = match self.title {
            Some(t) if !t.trim().is_empty() => Some(t),
            _ => {
                errors.push(FieldError::new("title", "title is required"));
                None
            }
        };
        let date = match self.date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_timestamp(raw).or_else(|| {
                errors.push(FieldError::new("date", "date must be an ISO-8601 timestamp"));
                None
            }),
            _ => {
                errors.push(FieldError::new("date", "date is required"));
                None
            }
        };

        match (title, date) {
            (Some(title), Some(date)) if errors.is_empty() => Ok(NewAgenda {
                title,
                description: self.description,
                date,
                image: self.image.filter(|url| !url.is_empty()),
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// UpdateAgendaRequest
///
/// Body of `PATCH /api/agenda/{id}`. Omitted keys keep their stored value;
/// `description: null` clears the description and `image: null` or `""` clears the image.
#[derive(Debug, Clone, Deserialize, ToSchema, Default)]
pub struct UpdateAgendaRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub title: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub description: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub date: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub image: Patch<String>,
}

/// Validated changes to apply onto a stored [`Agenda`]. `None` means "keep".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgendaPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<DateTime<Utc>>,
    pub image: Option<Option<String>>,
}

impl UpdateAgendaRequest {
    pub fn validate(self) -> Result<AgendaPatch, AppError> {
        let mut errors = Vec::new();

        let title = match self.title {
            Patch::Missing => None,
            Patch::Value(t) if !t.trim().is_empty() => Some(t),
            Patch::Null | Patch::Value(_) => {
                errors.push(FieldError::new("title", "title cannot be empty"));
                None
            }
        };
        let date = match self.date {
            Patch::Missing => None,
            Patch::Value(raw) if !raw.trim().is_empty() => {
                parse_timestamp(raw.trim()).or_else(|| {
                    errors.push(FieldError::new("date", "date must be an ISO-8601 timestamp"));
                    None
                })
            }
            Patch::Null | Patch::Value(_) => {
                errors.push(FieldError::new("date", "date cannot be empty"));
                None
            }
        };
        let description = match self.description {
            Patch::Missing => None,
            Patch::Null => Some(None),
            Patch::Value(d) => Some(Some(d)),
        };
        let image = match self.image {
            Patch::Missing => None,
            Patch::Value(url) if !url.is_empty() => Some(Some(url)),
            Patch::Null | Patch::Value(_) => Some(None),
        };

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        Ok(AgendaPatch {
            title,
            description,
            date,
            image,
        })
    }
}

impl AgendaPatch {
    /// Overlays the supplied fields onto `agenda`, leaving the rest untouched.
    pub fn apply(self, mut agenda: Agenda) -> Agenda {
        if let Some(title) = self.title {
            agenda.title = title;
        }
        if let Some(description) = self.description {
            agenda.description = description;
        }
        if let Some(date) = self.date {
            agenda.date = date;
        }
        if let Some(image) = self.image {
            agenda.image = image;
        }
        agenda
    }
}

/// CreateVolunteerRequest
///
/// Body of `POST /api/volunteers`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateVolunteerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    #[schema(example = "(11) 98765-4321")]
    pub phone: Option<String>,
    pub baptized: Option<bool>,
    #[schema(example = "musicteam")]
    pub ministry: Option<String>,
}

/// Validated form of [`CreateVolunteerRequest`]. The email is trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVolunteer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub baptized: bool,
    pub ministry: Ministry,
}

impl CreateVolunteerRequest {
    pub fn validate(self) -> Result<NewVolunteer, AppError> {
        let mut errors = Vec::new();

        let name = self.name.unwrap_or_default().trim().to_string();
        if name.chars().count() < MIN_VOLUNTEER_NAME_CHARS {
            errors.push(FieldError::new(
                "name",
                format!("name must have at least {} characters", MIN_VOLUNTEER_NAME_CHARS),
            ));
        }

        let email = self.email.unwrap_or_default().trim().to_lowercase();
        if !EMAIL_REGEX.is_match(&email) {
            errors.push(FieldError::new("email", "invalid email"));
        }

        let phone = self.phone.unwrap_or_default().trim().to_string();
        if phone.chars().count() < MIN_PHONE_CHARS {
            errors.push(FieldError::new("phone", "invalid phone number"));
        }

        if self.baptized.is_none() {
            errors.push(FieldError::new("baptized", "baptized is required"));
        }

        let ministry = match self.ministry.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("ministry", "select a ministry"));
                None
            }
            Some(raw) => raw.parse::<Ministry>().ok().or_else(|| {
                errors.push(FieldError::new("ministry", format!("unknown ministry: {}", raw)));
                None
            }),
        };

        match (self.baptized, ministry) {
            (Some(baptized), Some(ministry)) if errors.is_empty() => Ok(NewVolunteer {
                name,
                email,
                phone,
                baptized,
                ministry,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

// --- Response Schemas (Output) ---

/// Acknowledgement returned by `DELETE /api/agenda/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteResponse {
    pub message: String,
}

/// UploadResponse
///
/// Public URL of a freshly stored image.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UploadResponse {
    #[schema(example = "/uploads/0b9c5e3e-7f0e-4c1e-9d62-0c4b6f1d2a11.png")]
    pub url: String,
    pub success: bool,
}

/// Every image previously uploaded, as public URLs.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ImageListResponse {
    pub images: Vec<String>,
    pub success: bool,
}

/// Identity exposed to the browser by `GET /api/auth/session`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionInfo {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

/// SessionResponse
///
/// `user` is only present when `authenticated` is true.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionInfo>,
}

/// parse_timestamp
///
/// Accepts RFC 3339 (`2025-01-01T10:00:00Z`, `2025-01-01T10:00:00-03:00`), the
/// offset-less form produced by `datetime-local` inputs (read as UTC) and a bare
/// date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
