use std::sync::Arc;

use axum::{
    Form, Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::session::{removal_cookie, session_cookie};
use crate::auth::{MaybeUser, authenticate, register};
use crate::server::AppState;
use crate::server::dto::{FormView, IndexView, LoginForm, RegisterForm};
use crate::server::response::{ApiError, ApiResponse};
use crate::types::User;

fn signed_in(state: &AppState, jar: CookieJar, user: &User) -> Result<(CookieJar, Redirect), ApiError> {
    let token = state.tokens.issue(&user.name)?;
    let jar = jar.add(session_cookie(&token, state.cookie_secure));
    Ok((jar, Redirect::to("/repository")))
}

pub async fn index(MaybeUser(user): MaybeUser) -> impl IntoResponse {
    Json(ApiResponse::success(IndexView { user }))
}

pub async fn login_page() -> impl IntoResponse {
    Json(ApiResponse::success(FormView {
        action: "/token",
        method: "POST",
        fields: &["name", "password"],
    }))
}

pub async fn signup_page() -> impl IntoResponse {
    Json(ApiResponse::success(FormView {
        action: "/register",
        method: "POST",
        fields: &["name", "email", "password"],
    }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> impl IntoResponse {
    let user = authenticate(
        state.store.as_ref(),
        &state.passwords,
        &form.name,
        &form.password,
    )?;

    tracing::info!("User '{}' signed in", user.name);
    signed_in(&state, jar, &user)
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> impl IntoResponse {
    let user = register(
        state.store.as_ref(),
        &state.passwords,
        &form.name,
        &form.email,
        &form.password,
    )?;

    signed_in(&state, jar, &user)
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        jar.add(removal_cookie()),
        [(header::LOCATION, "/")],
    )
}
