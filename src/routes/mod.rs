/// Router Module Index
///
/// Splits routing by audience. Access control for pages is not applied here:
/// the access gate wraps the whole router (see `gate::access_gate`).

/// JSON API under `/api`, consumed by the public site and the admin area.
pub mod api;

/// Health check, uploaded images and the static site itself.
pub mod site;
