//! Access gate: decides, per request, whether to allow it, redirect it, or pass
//! it through to the API with CORS headers attached.
//!
//! The decision itself ([`GatePolicy::decide`]) is a pure function of the path,
//! method and session validity, so it can be exercised without a server. The
//! [`access_gate`] middleware feeds it from the live request.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN, VARY,
        },
    },
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use percent_encoding::percent_decode_str;

use crate::{auth::SessionState, config::AppConfig};

pub const CORS_ALLOW_METHODS: &str = "GET,DELETE,PATCH,POST,PUT";
pub const CORS_ALLOW_HEADERS: &str = "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, Content-MD5, Content-Type, Date, X-Api-Version";

/// Category of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Under the API prefix.
    Api,
    /// Assets, the site root and every page outside the admin area.
    Public,
    /// The sign-in page and anything below it.
    AuthPage,
    /// The admin area.
    ProtectedApp,
}

/// The gate's outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Forward to the router untouched.
    Allow,
    /// Answer with a temporary redirect to this path.
    Redirect(String),
    /// API request: attach CORS headers. Preflights are answered with 200 by
    /// the gate and never reach a handler.
    PassThroughCors { preflight: bool },
}

/// GatePolicy
///
/// The immutable path rules the gate evaluates.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub api_prefix: String,
    pub auth_path: String,
    pub app_root: String,
    pub asset_prefixes: Vec<String>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            api_prefix: "/api/".to_string(),
            auth_path: "/auth".to_string(),
            app_root: "/app".to_string(),
            asset_prefixes: ["/_next", "/static", "/assets", "/uploads"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// normalize_path
///
/// Resolves a raw request path the way the static file server does before it
/// touches the disk: percent-decoded, empty and `.` segments dropped, `..`
/// applied. Always starts with `/` and never ends with one (except the root).
pub fn normalize_path(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

/// `path` is `root` itself or a path nested below it (`/app`, `/app/x`, not `/apple`).
fn under(path: &str, root: &str) -> bool {
    path.strip_prefix(root)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

impl GatePolicy {
    fn is_asset(&self, path: &str) -> bool {
        path.contains("/favicon.ico") || self.asset_prefixes.iter().any(|p| under(path, p))
    }

    /// Classifies the normalized form of `path` (see [`normalize_path`]).
    pub fn classify(&self, path: &str) -> RouteClass {
        self.classify_normalized(&normalize_path(path))
    }

    fn classify_normalized(&self, path: &str) -> RouteClass {
        if path.starts_with(&self.api_prefix) {
            RouteClass::Api
        } else if path == "/" || self.is_asset(path) {
            RouteClass::Public
        } else if under(path, &self.auth_path) {
            RouteClass::AuthPage
        } else if under(path, &self.app_root) {
            RouteClass::ProtectedApp
        } else {
            RouteClass::Public
        }
    }

    /// decide
    ///
    /// Total over every input. An already signed-in user landing on the sign-in
    /// page itself is sent to the admin area; anonymous users are kept out of it.
    pub fn decide(&self, path: &str, method: &Method, has_session: bool) -> Disposition {
        let path = normalize_path(path);
        match self.classify_normalized(&path) {
            RouteClass::Api => Disposition::PassThroughCors {
                preflight: *method == Method::OPTIONS,
            },
            RouteClass::AuthPage if has_session && path == self.auth_path => {
                Disposition::Redirect(self.app_root.clone())
            }
            RouteClass::ProtectedApp if !has_session => {
                Disposition::Redirect(self.auth_path.clone())
            }
            _ => Disposition::Allow,
        }
    }
}

/// CorsPolicy
///
/// Writes the CORS headers attached to every API response.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    default_origin: HeaderValue,
}

impl CorsPolicy {
    pub fn new(default_origin: &str) -> Self {
        let default_origin = HeaderValue::from_str(default_origin).unwrap_or_else(|_| {
            tracing::warn!(origin = default_origin, "invalid default CORS origin, using *");
            HeaderValue::from_static("*")
        });
        Self { default_origin }
    }

    /// Echoes the caller's `Origin` when present, otherwise the configured default.
    pub fn apply(&self, origin: Option<HeaderValue>, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        headers.insert(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            origin.unwrap_or_else(|| self.default_origin.clone()),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        );
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }
}

/// AccessGate
///
/// Everything the middleware needs, built once at startup.
pub struct AccessGate {
    pub policy: GatePolicy,
    pub cors: CorsPolicy,
    pub sessions: SessionState,
}

impl AccessGate {
    pub fn new(config: &AppConfig, sessions: SessionState) -> Self {
        Self {
            policy: GatePolicy::default(),
            cors: CorsPolicy::new(&config.allowed_origin),
            sessions,
        }
    }

    /// Resolves the disposition for a live request. The session cookie is only
    /// verified for paths where the answer depends on it.
    pub fn disposition(&self, path: &str, method: &Method, headers: &HeaderMap) -> Disposition {
        let has_session = match self.policy.classify(path) {
            RouteClass::AuthPage | RouteClass::ProtectedApp => {
                self.sessions.identify(headers).is_some()
            }
            RouteClass::Api | RouteClass::Public => false,
        };
        self.policy.decide(path, method, has_session)
    }
}

/// access_gate
///
/// Middleware applied to the whole router, ahead of every page and API handler.
pub async fn access_gate(
    State(gate): State<Arc<AccessGate>>,
    request: Request,
    next: Next,
) -> Response {
    let disposition = gate.disposition(request.uri().path(), request.method(), request.headers());

    match disposition {
        Disposition::Allow => next.run(request).await,
        Disposition::Redirect(location) => {
            tracing::debug!(path = %request.uri().path(), %location, "gate redirect");
            Redirect::temporary(&location).into_response()
        }
        Disposition::PassThroughCors { preflight } => {
            let origin = request.headers().get(ORIGIN).cloned();
            let mut response = if preflight {
                StatusCode::OK.into_response()
            } else {
                next.run(request).await
            };
            gate.cors.apply(origin, response.headers_mut());
            response
        }
    }
}
