use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Redirect},
};

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{ReadFileParams, RemoveFileParams};
use crate::server::response::ApiError;

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

pub async fn add_file(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Path(link): Path<String>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        upload = Some((file_name, data));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError::bad_request("Missing multipart field 'file'"))?;

    state
        .lifecycle
        .add_file(&user, &link, &file_name, data)
        .await?;

    Ok::<_, ApiError>(Redirect::to(&format!("/repository/{link}")))
}

pub async fn remove_file(
    RequireUser(user): RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<RemoveFileParams>,
) -> impl IntoResponse {
    let repository = state
        .lifecycle
        .remove_file(&user, &params.bucket_name, &params.name)
        .await?;

    Ok::<_, ApiError>(Redirect::to(&format!("/repository/{}", repository.link)))
}

/// `attachment; filename="..."` with characters that would break the quoted
/// string replaced.
fn content_disposition(file_name: &str, fallback: &str) -> HeaderValue {
    let cleaned: String = file_name
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();

    HeaderValue::from_str(&format!("attachment; filename=\"{cleaned}\""))
        .or_else(|_| HeaderValue::from_str(&format!("attachment; filename=\"{fallback}\"")))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

pub async fn read_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReadFileParams>,
) -> impl IntoResponse {
    let (file, data) = state
        .lifecycle
        .read_file(&params.bucket_name, &params.key)
        .await?;

    Ok::<_, ApiError>((
        [
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&file.view_name, &file.name),
            ),
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_static("Content-Disposition"),
            ),
        ],
        data,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("Notes.txt", "notes.txt"),
            "attachment; filename=\"Notes.txt\""
        );
        assert_eq!(
            content_disposition("say \"hi\".txt", "say-hi.txt"),
            "attachment; filename=\"say _hi_.txt\""
        );
    }
}
