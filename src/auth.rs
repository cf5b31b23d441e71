use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::AppConfig, error::AppError, models::SessionInfo};

/// Claims
///
/// Payload of the session token issued by the external auth provider once a
/// magic link or OAuth sign-in completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): id of the signed-in user.
    pub sub: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Expiration Time (exp): the token is rejected afterwards.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// SessionUser
///
/// The identity resolved from a valid session cookie.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl From<Claims> for SessionUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            name: claims.name,
        }
    }
}

impl From<SessionUser> for SessionInfo {
    fn from(user: SessionUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// SessionVerifier
///
/// Extracts the session token from the request cookies and validates it
/// (HS256 signature against the shared provider secret, plus expiry). It never
/// fails: a missing, malformed, forged or expired token simply yields `None`.
pub struct SessionVerifier {
    cookie_name: String,
    key: DecodingKey,
    validation: Validation,
}

/// Shared handle used in the application state.
pub type SessionState = Arc<SessionVerifier>;

impl SessionVerifier {
    pub fn new(cookie_name: impl Into<String>, secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            cookie_name: cookie_name.into(),
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.session_cookie, &config.auth_secret)
    }

    /// Validates a raw token.
    pub fn verify_token(&self, token: &str) -> Option<SessionUser> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims.into()),
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected");
                None
            }
        }
    }

    /// Looks up the session cookie in `headers` and validates it.
    pub fn identify(&self, headers: &HeaderMap) -> Option<SessionUser> {
        let jar = CookieJar::from_headers(headers);
        let cookie = jar.get(&self.cookie_name)?;
        self.verify_token(cookie.value())
    }
}

/// issue_session_token
///
/// Signs a session token the way the auth provider does. Used by local tooling
/// and tests; production tokens come from the provider itself.
pub fn issue_session_token(
    secret: &str,
    user: &SessionUser,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        iat: now,
        exp: now + ttl_secs as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// SessionUser Extractor Implementation
///
/// Lets handlers demand a signed-in user. Rejection: `AppError::Unauthorized` (401).
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = SessionState::from_ref(state);
        verifier
            .identify(&parts.headers)
            .ok_or(AppError::Unauthorized)
    }
}

/// `Option<SessionUser>` never rejects; anonymous requests get `None`.
impl<S> OptionalFromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let verifier = SessionState::from_ref(state);
        Ok(verifier.identify(&parts.headers))
    }
}
