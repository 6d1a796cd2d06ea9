use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect},
};

use crate::auth::{MaybeUser, RequireUser};
use crate::server::AppState;
use crate::server::dto::{CreateRepositoryForm, RepositoryListView, RepositoryPage};
use crate::server::response::{ApiError, ApiResponse};

pub async fn list_repositories(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let repositories = state.lifecycle.list_repositories(&user)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(RepositoryListView {
        user,
        repositories,
    })))
}

pub async fn create_repository(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Form(form): Form<CreateRepositoryForm>,
) -> impl IntoResponse {
    state.lifecycle.create_repository(&user, &form.name).await?;

    Ok::<_, ApiError>(Redirect::to("/repository"))
}

pub async fn get_repository(
    MaybeUser(user): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
) -> impl IntoResponse {
    let view = state.lifecycle.repository_view(user.as_ref(), &link)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(RepositoryPage { user, view })))
}

/// Redirects back to the listing either way; storage left behind after the
/// rows are gone is reported in the body.
pub async fn delete_repository(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    let outcome = state.lifecycle.delete_repository(&user, &name).await?;

    Ok::<_, ApiError>((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, "/repository")],
        Json(ApiResponse::success(outcome)),
    ))
}
