use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// AppError
///
/// Every failure the API can surface. Repositories and the upload store return it
/// directly; `IntoResponse` translates each kind into its status code and a JSON
/// envelope so no handler ever builds an error response by hand.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid data")]
    Validation(Vec<FieldError>),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("this email is already registered")]
    DuplicateEmail,
    #[error("unsupported file type: {0}; only jpeg, png, gif and webp images are allowed")]
    UnsupportedMediaType(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("storage failure")]
    Storage(String),
}

impl AppError {
    /// Shorthand for a validation error on a single field.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DuplicateEmail
            | AppError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::DuplicateEmail => "duplicate_email",
            AppError::UnsupportedMediaType(_) => "unsupported_media_type",
            AppError::Unauthorized => "unauthorized",
            AppError::Storage(_) => "storage_failure",
        }
    }
}

/// ErrorBody
///
/// JSON envelope returned for every failed API call.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Machine-readable kind, e.g. `validation_error`.
    pub code: &'static str,
    /// Per-field messages for validation errors, debug text for storage failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            AppError::Validation(fields) => serde_json::to_value(fields).ok(),
            AppError::Storage(message) => {
                tracing::error!(error = %message, "storage failure");
                Some(serde_json::Value::String(message.clone()))
            }
            _ => None,
        };

        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
            details,
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid("body", rejection.body_text())
    }
}
