//! Resolves a request's session token to a user.

use axum_extra::extract::cookie::{Cookie, SameSite};

use super::TokenService;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::User;

/// Name of the cookie carrying `Bearer <token>`.
pub const SESSION_COOKIE: &str = "access_token";

const BEARER_PREFIXES: &[&str] = &["Bearer ", "Bearer%20"];

/// Strips the bearer scheme. Returns `None` for any other shape.
#[must_use]
pub fn strip_bearer(value: &str) -> Option<&str> {
    let token = BEARER_PREFIXES
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))?
        .trim();

    if token.is_empty() { None } else { Some(token) }
}

/// Picks the session credential: the cookie first, then the Authorization header.
#[must_use]
pub fn session_token<'a>(cookie: Option<&'a str>, authorization: Option<&'a str>) -> Option<&'a str> {
    cookie
        .and_then(strip_bearer)
        .or_else(|| authorization.and_then(strip_bearer))
}

/// Resolves a raw token to its user.
///
/// Missing or invalid tokens are `Unauthenticated`. A valid token naming a
/// user that no longer exists is `StaleIdentity`.
pub fn resolve_user(store: &dyn Store, tokens: &TokenService, token: Option<&str>) -> Result<User> {
    let token = token.ok_or(Error::Unauthenticated)?;
    let subject = tokens.verify(token).ok_or(Error::Unauthenticated)?;

    store.get_user_by_name(&subject)?.ok_or_else(|| {
        tracing::warn!("Session token for unknown user '{subject}'");
        Error::StaleIdentity
    })
}

#[must_use]
pub fn session_cookie(token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, format!("Bearer {token}")))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// A cookie that, once sent, makes the browser forget the session.
#[must_use]
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}
