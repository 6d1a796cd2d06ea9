use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::cookie::CookieJar;

use super::session::{SESSION_COOKIE, resolve_user, session_token};
use crate::error::Error;
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::User;

/// Extractor that requires a signed-in user.
///
/// Rejects with the `Unauthenticated` error, which the response layer turns
/// into a redirect to the login page.
pub struct RequireUser(pub User);

/// Extractor for routes open to anonymous viewers.
pub struct MaybeUser(pub Option<User>);

fn resolve(parts: &Parts, state: &AppState) -> Result<User, Error> {
    let jar = CookieJar::from_headers(&parts.headers);
    let cookie = jar.get(SESSION_COOKIE).map(|c| c.value());
    let authorization = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    resolve_user(
        state.store.as_ref(),
        &state.tokens,
        session_token(cookie, authorization),
    )
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(RequireUser(resolve(parts, state)?))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match resolve(parts, state) {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(Error::Unauthenticated | Error::StaleIdentity) => Ok(MaybeUser(None)),
            Err(e) => Err(e.into()),
        }
    }
}
