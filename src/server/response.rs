use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::json;

use crate::auth::session::removal_cookie;
use crate::error::Error;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            data: None,
            error: Some(message.into()),
        }
    }
}

/// API error that converts to a proper HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Set for errors answered with a redirect.
    pub location: Option<&'static str>,
    /// Whether the response also drops the session cookie.
    pub clear_session: bool,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            location: None,
            clear_session: false,
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Every unauthenticated request ends up on the login page.
    #[must_use]
    pub fn login_required() -> Self {
        Self {
            location: Some("/login"),
            ..Self::new(StatusCode::SEE_OTHER, "authentication required")
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Unauthenticated => ApiError::login_required(),
            Error::StaleIdentity => ApiError {
                clear_session: true,
                ..ApiError::bad_request(err.to_string())
            },
            Error::InvalidCredentials => ApiError::new(StatusCode::UNAUTHORIZED, err.to_string()),
            Error::Forbidden => ApiError::new(StatusCode::FORBIDDEN, "Forbidden"),
            Error::NotFound => ApiError::not_found("Not found"),
            Error::Conflict(message) => ApiError::new(StatusCode::CONFLICT, message),
            Error::LinkCollision => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            Error::Validation(message) => ApiError::bad_request(message),
            Error::Storage(e) => {
                tracing::error!("Storage failure: {e}");
                ApiError::new(StatusCode::BAD_GATEWAY, "Storage unavailable")
            }
            Error::Database(_) | Error::Io(_) | Error::Config(_) => {
                tracing::error!("Internal error: {err}");
                ApiError::internal("Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "data": null, "error": self.message });

        let jar = if self.clear_session {
            CookieJar::new().add(removal_cookie())
        } else {
            CookieJar::new()
        };

        match self.location {
            Some(location) => (self.status, jar, [(header::LOCATION, location)], Json(body)).into_response(),
            None => (self.status, jar, Json(body)).into_response(),
        }
    }
}
